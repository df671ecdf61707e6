use poem::{
    Route,
    http::StatusCode,
    middleware::{AddDataEndpoint, CorsEndpoint},
    test::{TestClient, TestResponse},
};
use placeholder_engine::core::fonts::FontBook;
use placeholder_engine::core::renderer::RenderingEngine;
use placeholder_engine::settings::Config;
use placeholder_engine::{AppState, init_openapi_route};
use serde_json::{Value, json};
use std::sync::Arc;
use tiny_skia::Pixmap;
use url::Url;

type App = CorsEndpoint<AddDataEndpoint<Route, Arc<AppState>>>;

const MAX_PREVIEWS: usize = 4;

fn app() -> (Arc<AppState>, TestClient<App>) {
    let engine = RenderingEngine::with_fonts(FontBook::empty());
    let public_url = Url::parse("https://placeholder.example/tool/").unwrap();
    let app_state = Arc::new(AppState::new(engine, public_url, MAX_PREVIEWS));
    let app = init_openapi_route(app_state.clone(), &Config::default());
    (app_state, TestClient::new(app))
}

fn content_type(resp: &TestResponse) -> String {
    resp.0
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_json(resp: TestResponse) -> Value {
    let body = resp.0.into_body().into_string().await.unwrap();
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn test_render_png_from_query() {
    let (_, cli) = app();
    let resp = cli
        .get("/render")
        .query("w", &300)
        .query("h", &150)
        .query("br", &10)
        .send()
        .await;
    resp.assert_status_is_ok();
    assert!(content_type(&resp).starts_with("image/png"));

    let bytes = resp.0.into_body().into_vec().await.unwrap();
    let pixmap = Pixmap::decode_png(&bytes).unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (300, 150));

    let center = pixmap.pixel(150, 20).unwrap();
    assert_eq!((center.red(), center.green(), center.blue()), (0xd1, 0xd5, 0xdb));
}

#[tokio::test]
async fn test_render_svg_from_query() {
    let (_, cli) = app();
    let resp = cli
        .get("/render")
        .query("w", &4000)
        .query("h", &4000)
        .query("fmt", &"SVG")
        .query("text", &"Tom & Jerry")
        .query("fs", &64)
        .send()
        .await;
    resp.assert_status_is_ok();
    assert!(content_type(&resp).starts_with("image/svg+xml"));

    let svg = resp.0.into_body().into_string().await.unwrap();
    assert!(svg.contains(r#"viewBox="0 0 4000 4000""#));
    assert!(svg.contains(r#"font-size="64""#));
    assert!(svg.contains("Tom &amp; Jerry"));
}

#[tokio::test]
async fn test_render_base64() {
    let (_, cli) = app();
    let resp = cli
        .get("/render")
        .query("w", &64)
        .query("h", &32)
        .query("base64", &true)
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(body["mime_type"], "image/png");
    assert_eq!(body["filename"], "placeholder-64x32.png");
    assert_eq!(body["meta"], "64 × 32 PNG / bg #d1d5db fg #6b7280");
    assert!(
        body["data_uri"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
}

#[tokio::test]
async fn test_render_form_post() {
    let (_, cli) = app();
    let resp = cli
        .post("/render")
        .content_type("application/json")
        .body_json(&json!({
            "width": "abc",
            "height": "99999",
            "background": "f0a",
            "label": "{w} by {h}",
            "format": "svg",
            "return_base64": true
        }))
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(body["mime_type"], "image/svg+xml");
    assert_eq!(body["filename"], "placeholder-150x4000.svg");
    assert_eq!(body["meta"], "150 × 4000 SVG / bg #ff00aa fg #6b7280");
}

#[tokio::test]
async fn test_share_url_is_canonical() {
    let (_, cli) = app();
    let resp = cli
        .get("/share")
        .query("w", &"0")
        .query("bg", &"ABC")
        .query("fmt", &"gif")
        .query("br", &"12")
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(
        body["query"],
        "w=150&h=150&bg=aabbcc&fg=6b7280&text=150+%C3%97+150&fmt=png&br=12"
    );
    assert_eq!(
        body["url"],
        "https://placeholder.example/tool/?w=150&h=150&bg=aabbcc&fg=6b7280&text=150+%C3%97+150&fmt=png&br=12"
    );
}

#[tokio::test]
async fn test_preview_slot_revokes_previous_object() {
    let (state, cli) = app();

    let resp = cli
        .post("/preview/main")
        .body_json(&json!({ "width": "120", "format": "svg" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let first = body_json(resp).await;
    let first_url = first["object_url"].as_str().unwrap().to_string();
    assert_eq!(first["filename"], "placeholder-120x150.svg");

    let resp = cli.get(&first_url).send().await;
    resp.assert_status_is_ok();

    let resp = cli
        .post("/preview/main")
        .body_json(&json!({ "width": "200" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let second = body_json(resp).await;
    let second_url = second["object_url"].as_str().unwrap().to_string();
    assert_ne!(first_url, second_url);
    assert_eq!(state.objects.len(), 1);

    cli.get(&first_url)
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let resp = cli.get(&second_url).send().await;
    resp.assert_status_is_ok();
    assert!(content_type(&resp).starts_with("image/png"));
}

#[tokio::test]
async fn test_preview_slots_are_independent() {
    let (state, cli) = app();
    for slot in ["a", "b", "a"] {
        cli.post(format!("/preview/{}", slot))
            .body_json(&json!({ "format": "svg" }))
            .send()
            .await
            .assert_status_is_ok();
    }
    assert_eq!(state.objects.len(), 2);
}

#[tokio::test]
async fn test_preview_slots_are_bounded() {
    let (state, cli) = app();
    let mut first_url = String::new();
    for i in 0..50 {
        let resp = cli
            .post(format!("/preview/s{}", i))
            .body_json(&json!({ "format": "svg" }))
            .send()
            .await;
        resp.assert_status_is_ok();
        if i == 0 {
            first_url = body_json(resp).await["object_url"]
                .as_str()
                .unwrap()
                .to_string();
        }
    }
    assert_eq!(state.previews.lock().len(), MAX_PREVIEWS);
    assert_eq!(state.objects.len(), MAX_PREVIEWS);

    cli.get(&first_url)
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let health = body_json(cli.get("/health").send().await).await;
    assert_eq!(health["previews"].as_u64().unwrap(), MAX_PREVIEWS as u64);
    assert_eq!(health["live_objects"].as_u64().unwrap(), MAX_PREVIEWS as u64);
}

#[tokio::test]
async fn test_delete_preview_revokes_object() {
    let (state, cli) = app();
    let resp = cli
        .post("/preview/gone")
        .body_json(&json!({ "format": "svg" }))
        .send()
        .await;
    resp.assert_status_is_ok();
    let object_url = body_json(resp).await["object_url"]
        .as_str()
        .unwrap()
        .to_string();

    cli.delete("/preview/gone")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(state.objects.is_empty());
    cli.get(&object_url)
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    cli.delete("/preview/gone")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_, cli) = app();
    let resp = cli.get("/health").send().await;
    resp.assert_status(StatusCode::OK);

    let health = body_json(resp).await;
    assert_eq!(health["status"].as_str().unwrap(), "healthy");
    assert_eq!(health["live_objects"].as_u64().unwrap(), 0);
    assert_eq!(health["previews"].as_u64().unwrap(), 0);
    assert_eq!(health["fonts"].as_u64().unwrap(), 0);
}
