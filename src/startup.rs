use std::net::TcpListener;

use actix_web::dev::{HttpServiceFactory, Server};
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;

use crate::account::Role;
use crate::configuration::{AuthSettings, Settings};
use crate::email_client::{EmailClient, SenderEmail};
use crate::media_client::MediaClient;
use crate::middleware::{AuthGate, RoleGate};
use crate::routes;

const ADMIN_ROLES: [Role; 2] = [Role::Admin, Role::Superadmin];

fn users_scope(auth: &AuthSettings) -> impl HttpServiceFactory {
    web::scope("/api/v1/users")
        .route("/register", web::post().to(routes::register))
        .route("/login", web::post().to(routes::login))
        .route("/refresh-token", web::post().to(routes::refresh_token))
        .route("/verify-email/{token}", web::get().to(routes::verify_email))
        .route("/forgot-password", web::post().to(routes::forgot_password))
        .route(
            "/reset-password/{token}",
            web::post().to(routes::reset_password),
        )
        .service(
            web::scope("")
                .wrap(AuthGate::new(auth.clone()))
                .route("/logout", web::get().to(routes::logout))
                .route("/current-user", web::get().to(routes::current_user))
                .route(
                    "/resend-email-verification",
                    web::post().to(routes::resend_email_verification),
                )
                .route("/change-password", web::post().to(routes::change_password))
                .route("/get-user", web::get().to(routes::get_users))
                .route(
                    "/get-user-based-on-company",
                    web::post().to(routes::get_users_by_company),
                )
                .route("/avatar", web::patch().to(routes::update_avatar))
                .route(
                    "/register-user-staff",
                    web::post().to(routes::register_user_staff),
                )
                .service(
                    web::resource("/update-user/{id}")
                        .wrap(RoleGate::allow(&ADMIN_ROLES))
                        .route(web::patch().to(routes::update_user)),
                )
                .service(
                    web::resource("/assign-role/{id}")
                        .wrap(RoleGate::allow(&ADMIN_ROLES))
                        .route(web::post().to(routes::assign_role)),
                )
                .service(
                    web::resource("/change-password-directly/{id}")
                        .wrap(RoleGate::allow(&ADMIN_ROLES))
                        .route(web::post().to(routes::change_password_directly)),
                ),
        )
}

fn company_scope(auth: &AuthSettings) -> impl HttpServiceFactory {
    web::scope("/api/v1/company")
        .wrap(AuthGate::new(auth.clone()))
        .route("/get-company", web::get().to(routes::get_companies))
        .route(
            "/get-company-options",
            web::get().to(routes::get_company_options),
        )
        .route("/get-company/{id}", web::get().to(routes::get_company_by_id))
        .service(
            web::resource("/create-company")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::post().to(routes::create_company)),
        )
        .service(
            web::resource("/update-company/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::update_company)),
        )
        .service(
            web::resource("/delete-company/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::delete().to(routes::delete_company)),
        )
        .service(
            web::resource("/update-company-logo/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::update_company_logo)),
        )
}

fn store_scope(auth: &AuthSettings) -> impl HttpServiceFactory {
    web::scope("/api/v1/store")
        .wrap(AuthGate::new(auth.clone()))
        .route("/get-store", web::get().to(routes::get_stores))
        .route(
            "/get-store-based-on-company",
            web::post().to(routes::get_stores_by_company),
        )
        .route("/get-store-options", web::get().to(routes::get_store_options))
        .route("/get-store/{id}", web::get().to(routes::get_store_by_id))
        .service(
            web::resource("/create-store")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::post().to(routes::create_store)),
        )
        .service(
            web::resource("/update-store/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::update_store)),
        )
        .service(
            web::resource("/delete-store/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::delete().to(routes::delete_store)),
        )
        .service(
            web::resource("/update-store-logo/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::update_store_logo)),
        )
}

fn master_scope(auth: &AuthSettings) -> impl HttpServiceFactory {
    web::scope("/api/v1/master")
        .wrap(AuthGate::new(auth.clone()))
        .route("/get-audit-question", web::get().to(routes::get_questions))
        .route(
            "/get-audit-question-by-store/{store_id}",
            web::get().to(routes::get_questions_by_store),
        )
        .route(
            "/get-audit-question/{id}",
            web::get().to(routes::get_question_by_id),
        )
        .route(
            "/get-assigned-audits",
            web::get().to(routes::get_assigned_questions),
        )
        .route(
            "/get-options/{question_id}",
            web::get().to(routes::get_options_by_question),
        )
        .route(
            "/start-auditing/{question_id}",
            web::get().to(routes::start_auditing),
        )
        .route(
            "/submit-audit-response",
            web::post().to(routes::submit_response),
        )
        .route("/get-responses", web::get().to(routes::get_responses))
        .route("/get-response/{id}", web::get().to(routes::get_response_by_id))
        .route(
            "/get-response-by-audit/{id}",
            web::get().to(routes::get_responses_by_audit_id),
        )
        .service(
            web::resource("/create-audit-question")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::post().to(routes::create_question)),
        )
        .service(
            web::resource("/update-audit-question/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::update_question)),
        )
        .service(
            web::resource("/delete-audit-question/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::delete().to(routes::delete_question)),
        )
        .service(
            web::resource("/create-option")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::post().to(routes::create_option)),
        )
        .service(
            web::resource("/update-option/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::update_option)),
        )
        .service(
            web::resource("/delete-option/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::delete().to(routes::delete_option)),
        )
        .service(
            web::resource("/assign-auditing/{question_id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::post().to(routes::assign_auditing)),
        )
        .service(
            web::resource("/toggle-published/{id}")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .route(web::patch().to(routes::toggle_published)),
        )
}

fn demo_request_scope(auth: &AuthSettings) -> impl HttpServiceFactory {
    web::scope("/api/v1/demoRequest")
        .route("/create", web::post().to(routes::create_demo_request))
        .service(
            web::scope("")
                .wrap(RoleGate::allow(&ADMIN_ROLES))
                .wrap(AuthGate::new(auth.clone()))
                .route("/get-all", web::get().to(routes::get_demo_requests))
                .route("/stats", web::get().to(routes::get_demo_request_stats))
                .route("/get/{id}", web::get().to(routes::get_demo_request_by_id))
                .route(
                    "/update/{id}",
                    web::patch().to(routes::update_demo_request),
                )
                .route(
                    "/delete/{id}",
                    web::delete().to(routes::delete_demo_request),
                ),
        )
}

pub fn run(
    listener: TcpListener,
    pool: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let sender = SenderEmail::parse(settings.email.sender.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let email_client = web::Data::new(EmailClient::new(settings.email.base_url.clone(), sender));
    let media_client = web::Data::new(MediaClient::new(settings.media.base_url.clone()));
    let pool = web::Data::new(pool);
    let auth_settings = settings.auth;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(web::Data::new(auth_settings.clone()))
            .app_data(email_client.clone())
            .app_data(media_client.clone())
            .route("/health_check", web::get().to(routes::health_check))
            .service(users_scope(&auth_settings))
            .service(company_scope(&auth_settings))
            .service(store_scope(&auth_settings))
            .service(master_scope(&auth_settings))
            .service(demo_request_scope(&auth_settings))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
