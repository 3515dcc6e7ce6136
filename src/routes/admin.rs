use crate::auth::{AuthError, AuthService, NewUser, RegisterData, RegisterError, UserPatch};
use crate::config::Config;
use crate::helper::sanitization_helpers;
use crate::middleware::{store_session_identity, AuthenticatedUser};
use crate::models::{
    ContactMessage, ContentKind, IntakeStatus, MediaFile, MediaKind, MessageStatus, Service,
    Testimonial,
};
use crate::store::{CmsStore, StoreError};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub fn config_auth(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(handle_login))
        .route("/logout", web::post().to(handle_logout))
        .route("/register", web::post().to(handle_register))
        .route("/session", web::get().to(get_session));
}

pub fn config_panel(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(get_dashboard))
        .route("/services", web::get().to(list_services))
        .route("/services", web::post().to(create_service))
        .route("/services/{id}", web::put().to(update_service))
        .route("/services/{id}", web::delete().to(delete_service))
        .route("/testimonials", web::get().to(list_testimonials))
        .route("/testimonials", web::post().to(create_testimonial))
        .route("/testimonials/{id}", web::put().to(update_testimonial))
        .route("/testimonials/{id}", web::delete().to(delete_testimonial))
        .route("/media", web::get().to(list_media))
        .route("/media", web::post().to(upload_media))
        .route("/media/{id}", web::delete().to(delete_media))
        .route("/users", web::get().to(list_users))
        .route("/users", web::post().to(create_user))
        .route("/users/{id}", web::put().to(update_user))
        .route("/users/{id}", web::delete().to(delete_user))
        .route("/content", web::put().to(update_content))
        .route("/intake", web::get().to(list_intake))
        .route("/intake/{id}/status", web::put().to(update_intake_status))
        .route("/messages", web::get().to(list_messages))
        .route("/messages/{id}/status", web::put().to(update_message_status));
}

fn internal_error(err: StoreError) -> HttpResponse {
    log::error!("Persistence layer error: {}", err);
    HttpResponse::InternalServerError().finish()
}

// --- Auth ---

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn handle_login(
    session: Session,
    auth: web::Data<AuthService>,
    form: web::Json<LoginForm>,
) -> impl Responder {
    match auth.login(&form.email, &form.password).await {
        Ok(user) => {
            store_session_identity(&session, &user);
            HttpResponse::Ok().json(user.without_hash())
        }
        Err(AuthError::InvalidCredentials) => HttpResponse::Unauthorized()
            .json(json!({ "message": "Invalid credentials or account suspended." })),
        Err(AuthError::Remote(reason)) => {
            log::error!("Remote login failed: {}", reason);
            HttpResponse::BadGateway()
                .json(json!({ "message": "The authentication service is unavailable." }))
        }
        Err(AuthError::Cache(err)) => {
            log::error!("Cache error during login: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn handle_logout(session: Session, auth: web::Data<AuthService>) -> impl Responder {
    auth.logout().await;
    session.purge();
    HttpResponse::Ok().json(json!({ "message": "Logged out." }))
}

async fn handle_register(
    auth: web::Data<AuthService>,
    form: web::Json<RegisterData>,
) -> impl Responder {
    match auth.register(form.into_inner()).await {
        Ok(()) => {
            HttpResponse::Created().json(json!({ "message": "User registered successfully" }))
        }
        Err(RegisterError::AlreadyExists) => HttpResponse::Conflict()
            .json(json!({ "message": "User with this email already exists" })),
        Err(RegisterError::Remote(reason)) => {
            log::error!("Remote registration failed: {}", reason);
            HttpResponse::BadGateway().json(json!({ "message": "Registration failed" }))
        }
        Err(err) => {
            log::error!("Registration failed: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_session(auth_user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(auth_user)
}

// --- Dashboard ---

#[derive(Default, Serialize)]
struct IntakeCounts {
    new: usize,
    contacted: usize,
    scheduled: usize,
    converted: usize,
    declined: usize,
}

#[derive(Default, Serialize)]
struct MessageCounts {
    new: usize,
    read: usize,
    replied: usize,
    archived: usize,
}

async fn get_dashboard(
    store: web::Data<CmsStore>,
    auth: web::Data<AuthService>,
) -> impl Responder {
    let services = store.services.all();
    let testimonials = store.testimonials.all();
    let intake = store.intake_submissions.all();
    let messages = store.contact_messages.all();

    let mut intake_counts = IntakeCounts::default();
    for submission in &intake {
        match submission.status {
            IntakeStatus::New => intake_counts.new += 1,
            IntakeStatus::Contacted => intake_counts.contacted += 1,
            IntakeStatus::Scheduled => intake_counts.scheduled += 1,
            IntakeStatus::Converted => intake_counts.converted += 1,
            IntakeStatus::Declined => intake_counts.declined += 1,
        }
    }

    let mut message_counts = MessageCounts::default();
    for message in &messages {
        match message.status {
            MessageStatus::New => message_counts.new += 1,
            MessageStatus::Read => message_counts.read += 1,
            MessageStatus::Replied => message_counts.replied += 1,
            MessageStatus::Archived => message_counts.archived += 1,
        }
    }

    HttpResponse::Ok().json(json!({
        "mode": store.mode(),
        "services": {
            "active": services.iter().filter(|s| s.active).count(),
            "popular": services.iter().filter(|s| s.popular).count(),
            "total": services.len(),
        },
        "testimonials": {
            "active": testimonials.iter().filter(|t| t.active).count(),
            "featured": testimonials.iter().filter(|t| t.featured).count(),
            "total": testimonials.len(),
        },
        "intake": { "total": intake.len(), "byStatus": intake_counts },
        "messages": { "total": messages.len(), "byStatus": message_counts },
        "media": { "total": store.media_files.len() },
        "users": { "total": auth.users().len() },
    }))
}

// --- Services ---

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceForm {
    title: String,
    price: String,
    description: String,
    #[serde(default)]
    features: Vec<String>,
    icon: String,
    #[serde(default)]
    popular: bool,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ServicePatch {
    title: Option<String>,
    price: Option<String>,
    description: Option<String>,
    features: Option<Vec<String>>,
    icon: Option<String>,
    popular: Option<bool>,
    active: Option<bool>,
}

async fn list_services(store: web::Data<CmsStore>) -> impl Responder {
    HttpResponse::Ok().json(store.services.all())
}

async fn create_service(
    store: web::Data<CmsStore>,
    form: web::Json<ServiceForm>,
) -> impl Responder {
    let form = form.into_inner();
    let now = Utc::now();
    let service = Service {
        id: Uuid::new_v4().to_string(),
        title: sanitization_helpers::strip_all_html(&form.title),
        price: sanitization_helpers::strip_all_html(&form.price),
        description: sanitization_helpers::strip_all_html(&form.description),
        features: form
            .features
            .iter()
            .map(|f| sanitization_helpers::strip_all_html(f))
            .collect(),
        icon: form.icon,
        popular: form.popular,
        active: form.active,
        created_at: now,
        updated_at: now,
    };
    match store.services.insert(service).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(err) => internal_error(err),
    }
}

async fn update_service(
    store: web::Data<CmsStore>,
    id: web::Path<String>,
    form: web::Json<ServicePatch>,
) -> impl Responder {
    let patch = form.into_inner();
    let result = store
        .services
        .update_with(&id, |service| {
            if let Some(title) = &patch.title {
                service.title = sanitization_helpers::strip_all_html(title);
            }
            if let Some(price) = &patch.price {
                service.price = sanitization_helpers::strip_all_html(price);
            }
            if let Some(description) = &patch.description {
                service.description = sanitization_helpers::strip_all_html(description);
            }
            if let Some(features) = &patch.features {
                service.features = features
                    .iter()
                    .map(|f| sanitization_helpers::strip_all_html(f))
                    .collect();
            }
            if let Some(icon) = &patch.icon {
                service.icon = icon.clone();
            }
            if let Some(popular) = patch.popular {
                service.popular = popular;
            }
            if let Some(active) = patch.active {
                service.active = active;
            }
            service.updated_at = Utc::now();
        })
        .await;
    match result {
        Ok(Some(updated)) => HttpResponse::Ok().json(updated),
        Ok(None) => HttpResponse::NotFound().body("Service not found"),
        Err(err) => internal_error(err),
    }
}

async fn delete_service(store: web::Data<CmsStore>, id: web::Path<String>) -> impl Responder {
    match store.services.delete(&id).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "deleted": id.into_inner() })),
        Ok(false) => HttpResponse::NotFound().body("Service not found"),
        Err(err) => internal_error(err),
    }
}

// --- Testimonials ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestimonialForm {
    name: String,
    title: String,
    image: String,
    video_thumb: String,
    #[serde(default)]
    video_url: Option<String>,
    quote: String,
    rating: u8,
    results: String,
    #[serde(default)]
    featured: bool,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TestimonialPatch {
    name: Option<String>,
    title: Option<String>,
    image: Option<String>,
    video_thumb: Option<String>,
    video_url: Option<String>,
    quote: Option<String>,
    rating: Option<u8>,
    results: Option<String>,
    featured: Option<bool>,
    active: Option<bool>,
}

async fn list_testimonials(store: web::Data<CmsStore>) -> impl Responder {
    HttpResponse::Ok().json(store.testimonials.all())
}

async fn create_testimonial(
    store: web::Data<CmsStore>,
    form: web::Json<TestimonialForm>,
) -> impl Responder {
    let form = form.into_inner();
    if !(1..=5).contains(&form.rating) {
        return HttpResponse::BadRequest().body("Rating must be between 1 and 5.");
    }
    let now = Utc::now();
    let testimonial = Testimonial {
        id: Uuid::new_v4().to_string(),
        name: sanitization_helpers::strip_all_html(&form.name),
        title: sanitization_helpers::strip_all_html(&form.title),
        image: form.image,
        video_thumb: form.video_thumb,
        video_url: form.video_url,
        quote: sanitization_helpers::strip_all_html(&form.quote),
        rating: form.rating,
        results: sanitization_helpers::strip_all_html(&form.results),
        featured: form.featured,
        active: form.active,
        created_at: now,
        updated_at: now,
    };
    match store.testimonials.insert(testimonial).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(err) => internal_error(err),
    }
}

async fn update_testimonial(
    store: web::Data<CmsStore>,
    id: web::Path<String>,
    form: web::Json<TestimonialPatch>,
) -> impl Responder {
    let patch = form.into_inner();
    if let Some(rating) = patch.rating {
        if !(1..=5).contains(&rating) {
            return HttpResponse::BadRequest().body("Rating must be between 1 and 5.");
        }
    }
    let result = store
        .testimonials
        .update_with(&id, |testimonial| {
            if let Some(name) = &patch.name {
                testimonial.name = sanitization_helpers::strip_all_html(name);
            }
            if let Some(title) = &patch.title {
                testimonial.title = sanitization_helpers::strip_all_html(title);
            }
            if let Some(image) = &patch.image {
                testimonial.image = image.clone();
            }
            if let Some(video_thumb) = &patch.video_thumb {
                testimonial.video_thumb = video_thumb.clone();
            }
            if let Some(video_url) = &patch.video_url {
                testimonial.video_url = Some(video_url.clone());
            }
            if let Some(quote) = &patch.quote {
                testimonial.quote = sanitization_helpers::strip_all_html(quote);
            }
            if let Some(rating) = patch.rating {
                testimonial.rating = rating;
            }
            if let Some(results) = &patch.results {
                testimonial.results = sanitization_helpers::strip_all_html(results);
            }
            if let Some(featured) = patch.featured {
                testimonial.featured = featured;
            }
            if let Some(active) = patch.active {
                testimonial.active = active;
            }
            testimonial.updated_at = Utc::now();
        })
        .await;
    match result {
        Ok(Some(updated)) => HttpResponse::Ok().json(updated),
        Ok(None) => HttpResponse::NotFound().body("Testimonial not found"),
        Err(err) => internal_error(err),
    }
}

async fn delete_testimonial(store: web::Data<CmsStore>, id: web::Path<String>) -> impl Responder {
    match store.testimonials.delete(&id).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "deleted": id.into_inner() })),
        Ok(false) => HttpResponse::NotFound().body("Testimonial not found"),
        Err(err) => internal_error(err),
    }
}

// --- Media ---

/// Maps a validated MIME type to a safe file extension. Intentionally not
/// configurable so an upload can never dictate its own extension.
fn mime_to_safe_extension(mime_type: &str) -> Option<&'static str> {
    let map: BTreeMap<&str, &str> = [
        ("application/pdf", "pdf"),
        ("image/gif", "gif"),
        ("image/jpeg", "jpg"),
        ("image/png", "png"),
        ("image/webp", "webp"),
        ("video/mp4", "mp4"),
        ("video/webm", "webm"),
    ]
    .iter()
    .cloned()
    .collect();

    map.get(mime_type).cloned()
}

fn safe_file_stem(original: &str) -> String {
    let stem = original.rsplit('/').next().unwrap_or(original);
    let stem = stem.rsplit('\\').next().unwrap_or(stem);
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

async fn list_media(store: web::Data<CmsStore>) -> impl Responder {
    let mut media = store.media_files.all();
    media.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    HttpResponse::Ok().json(media)
}

async fn upload_media(
    auth_user: AuthenticatedUser,
    store: web::Data<CmsStore>,
    config: web::Data<Config>,
    mut payload: Multipart,
) -> impl Responder {
    let max_bytes = config.max_upload_mb * 1024 * 1024;
    let mut bytes: Vec<u8> = Vec::new();
    let mut original_name = String::new();
    let mut content_type_str = String::new();
    let mut extension = String::new();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(err) => {
                return HttpResponse::BadRequest().body(format!("Malformed upload: {}", err))
            }
        };
        if field.name() != "file" {
            continue;
        }

        let Some(content_type) = field.content_type() else {
            return HttpResponse::BadRequest().body("Content-Type not available.");
        };
        content_type_str = content_type.to_string();
        extension = match mime_to_safe_extension(&content_type_str) {
            Some(ext) => ext.to_string(),
            None => {
                return HttpResponse::BadRequest().body(format!(
                    "Unsupported file type: '{}'.",
                    content_type_str
                ))
            }
        };
        original_name = field
            .content_disposition()
            .get_filename()
            .unwrap_or("upload")
            .to_string();

        while let Some(chunk) = field.next().await {
            let data = match chunk {
                Ok(data) => data,
                Err(err) => {
                    return HttpResponse::BadRequest().body(format!("Upload failed: {}", err))
                }
            };
            if (bytes.len() + data.len()) as u64 > max_bytes {
                return HttpResponse::BadRequest().body(format!(
                    "File is too large. Maximum size is {}MB.",
                    config.max_upload_mb
                ));
            }
            bytes.extend_from_slice(&data);
        }
    }

    if bytes.is_empty() {
        return HttpResponse::BadRequest().body("No file was uploaded.");
    }

    let filename = format!(
        "{}_{}.{}",
        Utc::now().timestamp_millis(),
        safe_file_stem(&original_name),
        extension
    );

    // The local blob is written first and unconditionally, so the upload
    // survives a remote storage failure.
    let file_path = PathBuf::from(&config.media_path).join(&filename);
    let write_result = web::block({
        let file_path = file_path.clone();
        let bytes = bytes.clone();
        move || -> std::io::Result<()> {
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file_path, &bytes)
        }
    })
    .await;
    match write_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            log::error!("Failed to write media file '{}': {}", filename, err);
            return HttpResponse::InternalServerError().finish();
        }
        Err(err) => {
            log::error!("Blocking error on media write: {}", err);
            return HttpResponse::InternalServerError().finish();
        }
    }

    let url = match store
        .upload_media_blob(&filename, bytes.clone(), &content_type_str)
        .await
    {
        Some(remote_url) => remote_url,
        None => format!("/media/{}", filename),
    };

    let media = MediaFile {
        id: Uuid::new_v4().to_string(),
        filename: filename.clone(),
        original_name,
        url,
        kind: MediaKind::from_content_type(&content_type_str),
        size: bytes.len() as u64,
        uploaded_at: Utc::now(),
        uploaded_by: auth_user.user_id,
    };

    match store.media_files.insert(media).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(err) => internal_error(err),
    }
}

async fn delete_media(
    store: web::Data<CmsStore>,
    config: web::Data<Config>,
    id: web::Path<String>,
) -> impl Responder {
    let Some(media) = store.media_files.find(&id) else {
        return HttpResponse::NotFound().body("Media file not found");
    };

    match store.media_files.delete(&id).await {
        Ok(_) => {}
        Err(err) => return internal_error(err),
    }

    // Best effort on the blob itself; a leftover file is only disk waste.
    let file_path = PathBuf::from(&config.media_path).join(&media.filename);
    if file_path.exists() {
        let removal = web::block(move || fs::remove_file(&file_path)).await;
        match removal {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::error!("Failed to delete media file '{}': {}", media.filename, err),
            Err(err) => log::error!("Blocking error on media delete: {}", err),
        }
    }

    HttpResponse::Ok().json(json!({ "deleted": id.into_inner() }))
}

// --- Users ---

async fn list_users(auth: web::Data<AuthService>) -> impl Responder {
    let users: Vec<_> = auth.users().iter().map(|user| user.without_hash()).collect();
    HttpResponse::Ok().json(users)
}

async fn create_user(auth: web::Data<AuthService>, form: web::Json<NewUser>) -> impl Responder {
    match auth.add_user(form.into_inner()) {
        Ok(user) => HttpResponse::Created().json(user.without_hash()),
        Err(RegisterError::AlreadyExists) => HttpResponse::Conflict()
            .json(json!({ "message": "User with this email already exists" })),
        Err(err) => {
            log::error!("Failed to create user: {}", err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn update_user(
    auth: web::Data<AuthService>,
    id: web::Path<String>,
    form: web::Json<UserPatch>,
) -> impl Responder {
    match auth.update_user(&id, form.into_inner()) {
        Ok(Some(user)) => HttpResponse::Ok().json(user.without_hash()),
        Ok(None) => HttpResponse::NotFound().body("User not found"),
        Err(err) => {
            log::error!("Failed to update user {}: {}", id, err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn delete_user(
    auth_user: AuthenticatedUser,
    session: Session,
    auth: web::Data<AuthService>,
    id: web::Path<String>,
) -> impl Responder {
    let deleting_self = auth_user.user_id == *id;
    match auth.delete_user(&id) {
        Ok(true) => {
            if deleting_self {
                // Removing one's own account invalidates the session with it.
                auth.logout().await;
                session.purge();
            }
            HttpResponse::Ok().json(json!({ "deleted": id.into_inner() }))
        }
        Ok(false) => HttpResponse::NotFound().body("User not found"),
        Err(err) => {
            log::error!("Failed to delete user {}: {}", id, err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

// --- Site content ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentForm {
    section: String,
    key: String,
    value: String,
    #[serde(rename = "type", default)]
    kind: Option<ContentKind>,
}

async fn update_content(
    auth_user: AuthenticatedUser,
    store: web::Data<CmsStore>,
    form: web::Json<ContentForm>,
) -> impl Responder {
    let form = form.into_inner();
    let kind = form.kind.unwrap_or(ContentKind::Text);
    let value = match kind {
        ContentKind::Text => sanitization_helpers::strip_all_html(&form.value),
        ContentKind::Html => sanitization_helpers::sanitize_html_fragment(&form.value),
        // Image references and JSON blobs are stored verbatim; they are
        // never rendered as markup.
        ContentKind::Image | ContentKind::Json => form.value.clone(),
    };

    match store
        .update_site_content(&form.section, &form.key, &value, kind, &auth_user.user_id)
        .await
    {
        Ok(entry) => HttpResponse::Ok().json(entry),
        Err(err) => internal_error(err),
    }
}

// --- Intake triage ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntakeStatusForm {
    status: IntakeStatus,
    #[serde(default)]
    notes: Option<String>,
}

async fn list_intake(store: web::Data<CmsStore>) -> impl Responder {
    let mut submissions = store.intake_submissions.all();
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    HttpResponse::Ok().json(submissions)
}

async fn update_intake_status(
    store: web::Data<CmsStore>,
    id: web::Path<String>,
    form: web::Json<IntakeStatusForm>,
) -> impl Responder {
    let form = form.into_inner();
    let result = store
        .intake_submissions
        .update_with(&id, |submission| {
            submission.status = form.status;
            if let Some(notes) = &form.notes {
                submission.notes = Some(sanitization_helpers::strip_all_html(notes));
            }
            submission.last_contacted_at = Some(Utc::now());
        })
        .await;
    match result {
        Ok(Some(updated)) => HttpResponse::Ok().json(updated),
        Ok(None) => HttpResponse::NotFound().body("Intake submission not found"),
        Err(err) => internal_error(err),
    }
}

// --- Message triage ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStatusForm {
    status: MessageStatus,
}

fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Link the admin screen opens in the external mail client to answer an
/// inquiry.
fn reply_link(message: &ContactMessage) -> String {
    format!(
        "mailto:{}?subject={}",
        message.email,
        percent_encode(&format!("Re: {}", message.subject))
    )
}

async fn list_messages(store: web::Data<CmsStore>) -> impl Responder {
    let mut messages = store.contact_messages.all();
    messages.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    HttpResponse::Ok().json(messages)
}

async fn update_message_status(
    store: web::Data<CmsStore>,
    id: web::Path<String>,
    form: web::Json<MessageStatusForm>,
) -> impl Responder {
    let status = form.status;
    let result = store
        .contact_messages
        .update_with(&id, |message| {
            message.status = status;
            match status {
                MessageStatus::Replied => message.replied_at = Some(Utc::now()),
                MessageStatus::New | MessageStatus::Read | MessageStatus::Archived => {}
            }
        })
        .await;
    match result {
        Ok(Some(updated)) => {
            let reply = reply_link(&updated);
            HttpResponse::Ok().json(json!({ "message": updated, "replyLink": reply }))
        }
        Ok(None) => HttpResponse::NotFound().body("Message not found"),
        Err(err) => internal_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn reply_link_encodes_the_subject() {
        let message = ContactMessage {
            id: "m1".to_string(),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            subject: "Pricing & plans?".to_string(),
            message: "Hi".to_string(),
            status: MessageStatus::New,
            priority: Priority::Medium,
            submitted_at: Utc::now(),
            replied_at: None,
        };
        assert_eq!(
            reply_link(&message),
            "mailto:sam@example.com?subject=Re%3A%20Pricing%20%26%20plans%3F"
        );
    }

    #[test]
    fn safe_file_stem_strips_paths_and_odd_characters() {
        assert_eq!(safe_file_stem("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_stem("before after.png"), "before-after");
        assert_eq!(safe_file_stem(""), "upload");
    }

    #[test]
    fn extension_mapping_rejects_unknown_types() {
        assert_eq!(mime_to_safe_extension("image/png"), Some("png"));
        assert_eq!(mime_to_safe_extension("application/x-sh"), None);
    }
}
