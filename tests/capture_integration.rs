//! End-to-end capture and comparison against a local HTTP server

use pagediff::async_api::Browser;
use pagediff::cdp::LaunchConfig;
use pagediff::{compare, CaptureRequest, Comparison, Error, Viewport, WaitCondition};
use std::sync::Once;
use tiny_http::{Header, Response, Server};

static INIT: Once = Once::new();

// Static markup with no animations or external resources, so repeated
// captures rasterize identically.
const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Static Page</title>
<style>
  html, body { margin: 0; background: #ffffff; }
  #banner { width: 200px; height: 100px; background: #3366cc; }
</style>
</head>
<body>
<div id="banner"></div>
</body>
</html>"#;

/// Start a simple test HTTP server
fn start_test_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18980").unwrap();
            for request in server.incoming_requests() {
                let response = match request.url() {
                    "/" => Response::from_string(PAGE_HTML).with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<Header>()
                            .unwrap(),
                    ),
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18980".to_string()
}

fn request(url: &str, viewport: Viewport) -> CaptureRequest {
    CaptureRequest {
        url: url.to_string(),
        viewport: Some(viewport),
        wait: Some(WaitCondition::Load),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn same_page_captures_identically() {
    let base_url = start_test_server();
    let browser = Browser::launch(LaunchConfig::default())
        .await
        .expect("Failed to launch browser");

    let viewport = Viewport {
        width: 800,
        height: 600,
    };
    let first_page = browser.new_page().await.expect("Failed to open page");
    let second_page = browser.new_page().await.expect("Failed to open page");

    let (first, second) = tokio::join!(
        first_page.capture(request(&base_url, viewport)),
        second_page.capture(request(&base_url, viewport)),
    );
    let first = first.expect("First capture failed");
    let second = second.expect("Second capture failed");

    let result = compare(&first, &second).expect("Comparison failed");
    assert_eq!(result, Comparison::Identical);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn different_viewports_report_dimension_mismatch() {
    let base_url = start_test_server();
    let browser = Browser::launch(LaunchConfig::default())
        .await
        .expect("Failed to launch browser");

    let first_page = browser.new_page().await.expect("Failed to open page");
    let second_page = browser.new_page().await.expect("Failed to open page");

    let (first, second) = tokio::join!(
        first_page.capture(request(
            &base_url,
            Viewport {
                width: 800,
                height: 600
            }
        )),
        second_page.capture(request(
            &base_url,
            Viewport {
                width: 1024,
                height: 768
            }
        )),
    );
    let first = first.expect("First capture failed");
    let second = second.expect("Second capture failed");

    let result = compare(&first, &second).expect("Comparison failed");
    assert_eq!(result, Comparison::DimensionMismatch);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn element_capture_matches_element_bounds() {
    let base_url = start_test_server();
    let browser = Browser::launch(LaunchConfig::default())
        .await
        .expect("Failed to launch browser");

    let page = browser.new_page().await.expect("Failed to open page");
    let mut element_request = request(
        &base_url,
        Viewport {
            width: 800,
            height: 600,
        },
    );
    element_request.target_selector = Some("#banner".to_string());

    let shot = page
        .capture(element_request)
        .await
        .expect("Element capture failed");

    let raster = pagediff::compare::decode_png(&shot).expect("Decode failed");
    assert_eq!(raster.dimensions(), (200, 100));

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn unmatched_selector_fails_before_comparison() {
    let base_url = start_test_server();
    let browser = Browser::launch(LaunchConfig::default())
        .await
        .expect("Failed to launch browser");

    let page = browser.new_page().await.expect("Failed to open page");
    let mut bad_request = request(
        &base_url,
        Viewport {
            width: 800,
            height: 600,
        },
    );
    bad_request.target_selector = Some("#does-not-exist".to_string());

    let err = page
        .capture(bad_request)
        .await
        .expect_err("Capture should fail");
    assert!(
        matches!(err, Error::SelectorNotFound { .. }),
        "expected SelectorNotFound, got {err:?}"
    );

    browser.close().await.unwrap();
}
