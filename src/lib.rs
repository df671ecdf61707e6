use std::sync::Arc;

use parking_lot::Mutex;
use poem::{
    EndpointExt, Route,
    middleware::{AddData, AddDataEndpoint, Cors, CorsEndpoint},
};
use poem_openapi::OpenApiService;
use url::Url;

use crate::core::renderer::RenderingEngine;
use crate::core::session::{ObjectStore, PreviewSessions};
use crate::settings::Config;

use crate::routes::render::ApiRender;

pub mod core;
pub mod routes;
pub mod schemas;
pub mod settings;

pub struct AppState {
    pub engine: RenderingEngine,
    pub objects: Arc<ObjectStore>,
    pub previews: Mutex<PreviewSessions>,
    pub public_url: Url,
}

impl AppState {
    pub fn new(engine: RenderingEngine, public_url: Url, max_previews: usize) -> Self {
        let objects = Arc::new(ObjectStore::new());
        Self {
            previews: Mutex::new(PreviewSessions::new(
                engine.clone(),
                objects.clone(),
                max_previews,
            )),
            engine,
            objects,
            public_url,
        }
    }
}

pub fn init_openapi_route(
    app_state: Arc<AppState>,
    config: &Config,
) -> CorsEndpoint<AddDataEndpoint<Route, Arc<AppState>>> {
    let prefix = config.prefix.clone().unwrap_or("/".to_string());
    let openapi_route =
        OpenApiService::new(ApiRender, "Placeholder Image API", "1.0").server(prefix.clone());

    let openapi_json_endpoint = openapi_route.spec_endpoint();
    let ui = openapi_route.swagger_ui();
    Route::new()
        .nest(prefix, openapi_route)
        .nest("/docs", ui)
        .at("openapi.json", openapi_json_endpoint)
        .with(AddData::new(app_state))
        .with(Cors::new())
}
