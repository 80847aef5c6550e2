//! These tests launch a real Chrome; run with `cargo test -- --ignored`.

use storefront_harness::page::index_selector;
use storefront_harness::AgenticBrowser;

const STORE_PAGE: &str = "data:text/html,<html><head><title>Shop</title></head><body>\
    <h1>Products</h1><input id='q' placeholder='Search'>\
    <button onclick=\"document.querySelector('h1').innerText='Cart (1)'\">Add to cart</button>\
    </body></html>";

#[tokio::test]
#[ignore = "requires a local Chrome"]
async fn test_interactive_tree_indexes_controls() {
    let browser = AgenticBrowser::builder()
        .headless(true)
        .build()
        .await
        .expect("Failed to launch browser");

    let page = browser.new_page(STORE_PAGE).await.expect("Failed to open page");

    let tree = page.interactive_tree().await.expect("Failed to build tree");
    assert!(tree.contains("[0]<input> Search type=text"), "Tree was: {tree}");
    assert!(tree.contains("[1]<button> Add to cart"), "Tree was: {tree}");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires a local Chrome"]
async fn test_click_and_type_by_index() {
    let browser = AgenticBrowser::builder()
        .headless(true)
        .build()
        .await
        .expect("Failed to launch browser");

    let page = browser.new_page(STORE_PAGE).await.expect("Failed to open page");
    page.interactive_tree().await.expect("Failed to build tree");

    page.type_text(&index_selector(0), "iPhone")
        .await
        .expect("Failed to type");
    page.click(&index_selector(1)).await.expect("Failed to click");

    let heading = page.text_content("h1").await.expect("Failed to get text");
    assert_eq!(heading, "Cart (1)");
    assert_eq!(page.title().await.expect("Failed to get title"), "Shop");

    browser.close().await.expect("Failed to close browser");
}
