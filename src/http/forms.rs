use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;

use crate::app::forms::{ImageUpload, PostInput};
use crate::http::AppError;

/// Collects the post form's multipart fields. Unknown fields are skipped and an
/// empty file part counts as no upload.
pub async fn read_post_form(mut multipart: Multipart) -> Result<PostInput, AppError> {
    let mut input = PostInput::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => input.text = field_text(field).await?,
            "group" => input.group = field_text(field).await?,
            "image-clear" => input.clear_image = !field_text(field).await?.is_empty(),
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    input.image = Some(ImageUpload { file_name, bytes });
                }
            }
            _ => {}
        }
    }

    Ok(input)
}

async fn field_text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

fn multipart_error(err: MultipartError) -> AppError {
    tracing::debug!(error = %err, status = %err.status(), "rejected multipart body");
    AppError::new(err.status(), err.body_text())
}
