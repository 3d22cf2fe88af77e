//! Read-only template catalogue endpoints.

use crate::error::AppError;
use crate::templates::{self, Template};
use axum::extract::Path;
use axum::Json;

pub async fn list_templates() -> Json<Vec<&'static Template>> {
    Json(templates::list())
}

pub async fn get_template(Path(template_id): Path<String>) -> Result<Json<&'static Template>, AppError> {
    templates::get(&template_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("unknown template '{template_id}'")))
}
