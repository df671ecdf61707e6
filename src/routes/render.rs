use std::sync::Arc;

use poem::{Request, web::Data};
use poem_openapi::{
    OpenApi, Tags,
    param::{Path, Query},
    payload::{Attachment, AttachmentType, Json},
};

use crate::{
    AppState,
    core::{
        codec,
        error::RenderError,
        renderer::Rendered,
        spec::{Format, RawInputs, RenderSpec, normalize},
    },
    schemas::{
        common::{InternalServerErrorResponse, NotFoundResponse},
        render::{
            Base64Response, DeletePreviewResponse, HealthResponse, ObjectResponse,
            PreviewResponse, PreviewResult, RenderForm, RenderResponse, ShareResponse,
            TooLargeResponse,
        },
    },
};

#[derive(Tags)]
enum ApiRenderTags {
    Render,
    Preview,
}

pub struct ApiRender;

/// Renders `raw`, or explains why not.
async fn render_spec(state: &AppState, raw: &RawInputs) -> Result<(RenderSpec, Rendered), RenderError> {
    let spec = normalize(raw);
    tracing::info!(
        "Rendering: {}x{} {}, text={:?}",
        spec.width(),
        spec.height(),
        spec.format().as_str(),
        spec.text()
    );

    let rendered = state.engine.render(spec.clone()).await?;
    tracing::info!(
        "Render completed successfully, size: {} bytes",
        rendered.bytes().len()
    );
    Ok((spec, rendered))
}

async fn respond(state: &AppState, raw: RawInputs, return_base64: bool) -> RenderResponse {
    let (spec, rendered) = match render_spec(state, &raw).await {
        Ok(res) => res,
        Err(e) => return render_failure(e),
    };

    if return_base64 {
        return RenderResponse::Base64(Json(Base64Response {
            data: rendered.base64(),
            mime_type: rendered.mime_type().to_string(),
            data_uri: rendered.data_uri(),
            filename: spec.filename(),
            meta: spec.summary(),
        }));
    }

    let attachment = Attachment::new(rendered.into_bytes())
        .filename(spec.filename())
        .attachment_type(AttachmentType::Inline);
    match spec.format() {
        Format::Png => RenderResponse::Png(attachment),
        Format::Svg => RenderResponse::Svg(attachment),
    }
}

fn render_failure(e: RenderError) -> RenderResponse {
    match e {
        RenderError::ImageTooLarge { width, height } => {
            tracing::warn!("Refusing to render {}x{}", width, height);
            RenderResponse::TooLarge(Json(TooLargeResponse::new(width, height)))
        }
        e => RenderResponse::InternalServerError(Json(render_error_body("render", &e))),
    }
}

fn render_error_body(function: &str, e: &RenderError) -> InternalServerErrorResponse {
    InternalServerErrorResponse::new("route.render", function, "Rendering failed", &e.to_string())
}

#[OpenApi()]
impl ApiRender {
    /// Render from query
    ///
    /// Renders the image described by a share query string, e.g.
    /// `/render?w=300&h=150&bg=d1d5db&fg=6b7280&text=Hello&fmt=png&br=10`.
    /// Pass `base64=true` to get JSON instead of the image bytes.
    #[oai(path = "/render", method = "get", tag = "ApiRenderTags::Render")]
    async fn render_query(
        &self,
        req: &Request,
        base64: Query<Option<bool>>,
        state: Data<&Arc<AppState>>,
    ) -> RenderResponse {
        let raw = codec::decode(req.uri().query().unwrap_or_default());
        respond(&state, raw, base64.0.unwrap_or(false)).await
    }

    /// Render from form fields
    ///
    /// # Example Request
    /// ```json
    /// {
    ///   "width": "300",
    ///   "height": "150",
    ///   "label": "{w} x {h}",
    ///   "radius": "10",
    ///   "format": "svg"
    /// }
    /// ```
    #[oai(path = "/render", method = "post", tag = "ApiRenderTags::Render")]
    async fn render_form(
        &self,
        Json(form): Json<RenderForm>,
        state: Data<&Arc<AppState>>,
    ) -> RenderResponse {
        let return_base64 = form.return_base64.unwrap_or(false);
        respond(&state, form.into(), return_base64).await
    }

    /// Share URL
    ///
    /// Canonicalizes a query string and returns the full shareable URL.
    #[oai(path = "/share", method = "get", tag = "ApiRenderTags::Render")]
    async fn share(&self, req: &Request, state: Data<&Arc<AppState>>) -> Json<ShareResponse> {
        let spec = normalize(&codec::decode(req.uri().query().unwrap_or_default()));
        Json(ShareResponse {
            url: codec::share_url(&state.public_url, &spec).to_string(),
            query: codec::encode(&spec),
            filename: spec.filename(),
            meta: spec.summary(),
        })
    }

    /// Update preview
    ///
    /// Renders into a named preview slot. The slot's previous object is
    /// revoked; on failure the slot keeps its last good render.
    #[oai(path = "/preview/:slot", method = "post", tag = "ApiRenderTags::Preview")]
    async fn preview(
        &self,
        slot: Path<String>,
        Json(form): Json<RenderForm>,
        state: Data<&Arc<AppState>>,
    ) -> PreviewResult {
        let (spec, rendered) = match render_spec(&state, &form.into()).await {
            Ok(res) => res,
            Err(RenderError::ImageTooLarge { width, height }) => {
                tracing::warn!("Refusing to preview {}x{}", width, height);
                return PreviewResult::TooLarge(Json(TooLargeResponse::new(width, height)));
            }
            Err(e) => {
                return PreviewResult::InternalServerError(Json(render_error_body("preview", &e)));
            }
        };

        let mut previews = state.previews.lock();
        let session = previews.session(&slot.0);
        let preview = session.commit(spec, rendered);
        let (filename, meta, query) = (preview.filename(), preview.summary(), preview.query());
        let object_url = session
            .object()
            .map(|handle| handle.path())
            .unwrap_or_default();

        PreviewResult::Ok(Json(PreviewResponse {
            object_url,
            filename,
            meta,
            query,
        }))
    }

    /// Delete preview
    ///
    /// Drops a preview slot and revokes its object.
    #[oai(path = "/preview/:slot", method = "delete", tag = "ApiRenderTags::Preview")]
    async fn delete_preview(
        &self,
        slot: Path<String>,
        state: Data<&Arc<AppState>>,
    ) -> DeletePreviewResponse {
        if state.previews.lock().remove(&slot.0) {
            tracing::info!("preview {:?} deleted", slot.0);
            DeletePreviewResponse::Deleted
        } else {
            DeletePreviewResponse::NotFound(Json(NotFoundResponse::default()))
        }
    }

    /// Fetch preview object
    #[oai(path = "/objects/:id", method = "get", tag = "ApiRenderTags::Preview")]
    async fn object(&self, id: Path<u64>, state: Data<&Arc<AppState>>) -> ObjectResponse {
        let Some(object) = state.objects.get(id.0) else {
            return ObjectResponse::NotFound(Json(NotFoundResponse::default()));
        };

        let attachment = Attachment::new(object.bytes.as_ref().clone())
            .filename(object.filename)
            .attachment_type(AttachmentType::Inline);
        if object.content_type.starts_with(Format::Svg.mime_type()) {
            ObjectResponse::Svg(attachment)
        } else {
            ObjectResponse::Png(attachment)
        }
    }

    #[oai(path = "/health", method = "get")]
    async fn health(&self, state: Data<&Arc<AppState>>) -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "healthy".to_string(),
            live_objects: state.objects.len() as u64,
            previews: state.previews.lock().len() as u64,
            fonts: state.engine.fonts().len() as u64,
        })
    }
}
