use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::{
    body::{Bytes, Full},
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart},
    http::{header, HeaderValue, Response},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::audio_processor::load_audio_file;
use crate::models::{ClipRequest, UploadedFile};

/// Directory uploaded files are saved to.
pub const UPLOAD_DIR: &str = "uploads";
/// Directory extracted clips are written to.
pub const EXTRACT_DIR: &str = "extracted";

// Axum caps multipart bodies at 2 MiB by default, far too small for audio.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub fn create_routes() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
}

// Codec internals can panic on malformed headers (e.g. a WAV declaring a
// zero sample rate). Keep the worker contract: every outcome is a
// plain-text body, never a dropped connection.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Full<Bytes>> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("panic");
    tracing::error!(detail, "request handler panicked");
    let mut response = Response::new(Full::from(format!("Erreur : {detail}")));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

// A simple GET route returning the upload form
async fn index() -> Html<&'static str> {
    tracing::info!("serving index form");
    Html(
        r#"
    <!DOCTYPE html>
    <html lang="fr">
      <head>
        <meta charset="utf-8">
        <title>Extracteur audio</title>
        <link href="https://cdn.jsdelivr.net/npm/tailwindcss@3.2.7/dist/tailwind.min.css" rel="stylesheet">
      </head>
      <body class="p-4">
        <h1 class="text-2xl font-bold mb-4">Extracteur audio</h1>
        <form action="/upload" method="post" enctype="multipart/form-data" class="space-y-4">
          <div>
            <label class="block font-medium">Fichier audio</label>
            <input type="file" name="file" required />
          </div>
          <div>
            <label class="block font-medium">Début (minutes / secondes)</label>
            <input type="number" name="start_min" value="0" class="border rounded p-1 w-20" />
            <input type="number" name="start_sec" value="0" class="border rounded p-1 w-20" />
          </div>
          <div>
            <label class="block font-medium">Fin (minutes / secondes)</label>
            <input type="number" name="end_min" value="0" class="border rounded p-1 w-20" />
            <input type="number" name="end_sec" value="0" class="border rounded p-1 w-20" />
          </div>
          <div>
            <label class="block font-medium">Format de sortie</label>
            <input type="text" name="output_format" value="wav" class="border rounded p-1 w-40" />
          </div>
          <div>
            <label class="block font-medium">Nom du fichier de sortie</label>
            <input type="text" name="output_name" class="border rounded p-1 w-full" required />
          </div>
          <button type="submit" class="bg-blue-500 text-white px-4 py-2 rounded">Extraire</button>
        </form>
      </body>
    </html>
    "#,
    )
}

// Accept the multipart upload and run the whole flow: save, decode, slice,
// encode. Every outcome is a plain-text 200 body.
async fn upload(mut multipart: Multipart) -> String {
    tracing::info!("received clip extraction request");

    let (file, fields) = match read_form(&mut multipart).await {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!(error = %e, "failed to read multipart body");
            return format!("Erreur : {e}");
        }
    };

    let Some(file) = file else {
        tracing::error!("no file part in request");
        return "Aucun fichier trouvé dans la requête.".to_string();
    };
    if file.filename.is_empty() {
        tracing::error!("file part has an empty filename");
        return "Aucun fichier sélectionné.".to_string();
    }
    tracing::info!(filename = %file.filename, size = file.data.len(), "file received");

    let upload_path = Path::new(UPLOAD_DIR).join(&file.filename);
    if let Err(e) = save_upload(&upload_path, &file.data).await {
        tracing::error!(path = %upload_path.display(), error = %e, "failed to save upload");
        return format!("Erreur : {e}");
    }
    tracing::info!(path = %upload_path.display(), "upload saved");

    let request = match ClipRequest::from_form(&fields) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "invalid form data");
            return format!("Erreur dans les données du formulaire : {e}");
        }
    };
    tracing::debug!(?request, "form data parsed");

    let (start_ms, end_ms) = (request.start_ms(), request.end_ms());
    tracing::info!(start_ms, end_ms, "timestamps converted");

    let audio = match load_audio_file(&upload_path) {
        Ok(audio) => audio,
        Err(e) => {
            tracing::error!(error = %e, "failed to decode audio");
            return format!("Erreur lors du chargement du fichier audio : {e}");
        }
    };
    tracing::info!(
        duration_ms = audio.duration_ms(),
        sample_rate = audio.sample_rate(),
        "audio decoded"
    );

    let clip = audio.slice_ms(start_ms, end_ms);
    tracing::info!(clip_ms = clip.duration_ms(), "clip extracted");

    // Output name and format are trusted verbatim, like the upload filename.
    let output_path = output_path(&request);
    match clip.export(&output_path, &request.output_format) {
        Ok(()) => {
            tracing::info!(path = %output_path.display(), "clip saved");
            format!(
                "Extraction réussie ! Fichier sauvegardé : {}",
                output_path.display()
            )
        }
        Err(e) => {
            tracing::error!(path = %output_path.display(), error = %e, "failed to save clip");
            format!("Erreur lors de la sauvegarde de l'extrait audio : {e}")
        }
    }
}

fn output_path(request: &ClipRequest) -> PathBuf {
    Path::new(EXTRACT_DIR).join(format!(
        "{}.{}",
        request.output_name, request.output_format
    ))
}

/// Drain the multipart stream into the file part and the named text fields.
async fn read_form(
    multipart: &mut Multipart,
) -> Result<(Option<UploadedFile>, HashMap<String, String>), MultipartError> {
    let mut file = None;
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            file = Some(UploadedFile { filename, data });
        } else {
            fields.insert(name, field.text().await?);
        }
    }
    Ok((file, fields))
}

async fn save_upload(path: &Path, data: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(UPLOAD_DIR).await?;
    tokio::fs::write(path, data).await
}
