use crate::helper::sanitization_helpers;
use crate::models::{ContactMessage, IntakeStatus, IntakeSubmission, MessageStatus, Priority};
use crate::store::CmsStore;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/status", web::get().to(get_status))
            .route("/services", web::get().to(get_services))
            .route("/testimonials", web::get().to(get_testimonials))
            .route("/content", web::get().to(get_all_content))
            .route("/content/{section}", web::get().to(get_section_content))
            .route("/intake", web::post().to(submit_intake))
            .route("/contact", web::post().to(submit_contact)),
    );
}

/// Connectivity probe for the banner: reports whether the persistence layer
/// is still talking to the remote backend or has degraded to the cache.
async fn get_status(store: web::Data<CmsStore>) -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok", "mode": store.mode() }))
}

async fn get_services(store: web::Data<CmsStore>) -> impl Responder {
    let services: Vec<_> = store
        .services
        .all()
        .into_iter()
        .filter(|service| service.active)
        .collect();
    HttpResponse::Ok().json(services)
}

async fn get_testimonials(store: web::Data<CmsStore>) -> impl Responder {
    let testimonials: Vec<_> = store
        .testimonials
        .all()
        .into_iter()
        .filter(|testimonial| testimonial.active)
        .collect();
    HttpResponse::Ok().json(testimonials)
}

async fn get_all_content(store: web::Data<CmsStore>) -> impl Responder {
    HttpResponse::Ok().json(store.site_content.all())
}

async fn get_section_content(
    section: web::Path<String>,
    store: web::Data<CmsStore>,
) -> impl Responder {
    let section = section.into_inner();
    let entries: Vec<_> = store
        .site_content
        .all()
        .into_iter()
        .filter(|entry| entry.section == section)
        .collect();
    HttpResponse::Ok().json(entries)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    age: u32,
    fitness_level: String,
    goals: String,
    #[serde(default)]
    injuries: Option<String>,
    #[serde(default)]
    availability: Vec<String>,
    preferred_service: String,
    #[serde(default)]
    budget: Option<String>,
    #[serde(default)]
    additional_info: Option<String>,
}

async fn submit_intake(store: web::Data<CmsStore>, form: web::Json<IntakeForm>) -> impl Responder {
    let form = form.into_inner();
    let submission = IntakeSubmission {
        id: Uuid::new_v4().to_string(),
        first_name: sanitization_helpers::strip_all_html(&form.first_name),
        last_name: sanitization_helpers::strip_all_html(&form.last_name),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        age: form.age,
        fitness_level: form.fitness_level,
        goals: sanitization_helpers::strip_all_html(&form.goals),
        injuries: form
            .injuries
            .map(|text| sanitization_helpers::strip_all_html(&text)),
        availability: form.availability,
        preferred_service: form.preferred_service,
        budget: form.budget,
        additional_info: form
            .additional_info
            .map(|text| sanitization_helpers::strip_all_html(&text)),
        status: IntakeStatus::New,
        notes: None,
        submitted_at: Utc::now(),
        last_contacted_at: None,
    };

    match store.intake_submissions.insert(submission).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => {
            log::error!("Failed to store intake submission: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    name: String,
    email: String,
    subject: String,
    message: String,
    #[serde(default)]
    priority: Option<Priority>,
}

async fn submit_contact(store: web::Data<CmsStore>, form: web::Json<ContactForm>) -> impl Responder {
    let form = form.into_inner();
    let message = ContactMessage {
        id: Uuid::new_v4().to_string(),
        name: sanitization_helpers::strip_all_html(&form.name),
        email: form.email.trim().to_string(),
        subject: sanitization_helpers::strip_all_html(&form.subject),
        message: sanitization_helpers::strip_all_html(&form.message),
        status: MessageStatus::New,
        priority: form.priority.unwrap_or(Priority::Medium),
        submitted_at: Utc::now(),
        replied_at: None,
    };

    match store.contact_messages.insert(message).await {
        Ok(created) => HttpResponse::Created().json(created),
        Err(e) => {
            log::error!("Failed to store contact message: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::local::LocalCache;
    use crate::store::{ModeFlag, StoreMode};
    use actix_web::{test, App};
    use std::sync::Arc;

    async fn test_store() -> (tempfile::TempDir, web::Data<CmsStore>) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(LocalCache::open(&dir.path().join("cache.db")).unwrap());
        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        let store = CmsStore::open(cache, None, mode).await.unwrap();
        (dir, web::Data::new(store))
    }

    #[actix_web::test]
    async fn status_reports_local_mode() {
        let (_dir, store) = test_store().await;
        let app =
            test::init_service(App::new().app_data(store.clone()).configure(config_api)).await;
        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mode"], "local");
    }

    #[actix_web::test]
    async fn public_services_exclude_inactive() {
        let (_dir, store) = test_store().await;
        store
            .services
            .update_with("1", |service| service.active = false)
            .await
            .unwrap();

        let app =
            test::init_service(App::new().app_data(store.clone()).configure(config_api)).await;
        let req = test::TestRequest::get().uri("/api/services").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|s| s["id"] != "1"));
    }

    #[actix_web::test]
    async fn intake_submission_roundtrip() {
        let (_dir, store) = test_store().await;
        let app =
            test::init_service(App::new().app_data(store.clone()).configure(config_api)).await;

        let req = test::TestRequest::post()
            .uri("/api/intake")
            .set_json(serde_json::json!({
                "firstName": "Jane",
                "lastName": "Doe",
                "email": "jane@example.com",
                "phone": "555-0101",
                "age": 29,
                "fitnessLevel": "intermediate",
                "goals": "Train for a half marathon",
                "availability": ["weekday-evenings"],
                "preferredService": "personal"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "new");
        assert!(!body["id"].as_str().unwrap().is_empty());
        assert_eq!(store.intake_submissions.len(), 1);
    }

    #[actix_web::test]
    async fn contact_defaults_to_medium_priority() {
        let (_dir, store) = test_store().await;
        let app =
            test::init_service(App::new().app_data(store.clone()).configure(config_api)).await;

        let req = test::TestRequest::post()
            .uri("/api/contact")
            .set_json(serde_json::json!({
                "name": "Sam",
                "email": "sam@example.com",
                "subject": "Pricing",
                "message": "Do you offer couples sessions?"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["priority"], "medium");
        assert_eq!(body["status"], "new");
    }
}
