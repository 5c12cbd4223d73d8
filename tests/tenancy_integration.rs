use std::net::TcpListener;

use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};

use auditpro::configuration::{get_configuration, DatabaseSettings};
use auditpro::startup::run;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let server = run(listener, connection_pool.clone(), configuration)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

/// Registers and logs in a tenant owner, returning its access token.
async fn owner_token(app: &TestApp, email: &str) -> String {
    let client = reqwest::Client::new();
    let response = client
        .post(&format!("{}/api/v1/users/register", app.address))
        .json(&json!({ "name": "Owner", "email": email, "password": "secret1" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    let response = client
        .post(&format!("{}/api/v1/users/login", app.address))
        .json(&json!({ "email": email, "password": "secret1" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

async fn create_company(app: &TestApp, token: &str, name: &str) -> String {
    let response = reqwest::Client::new()
        .post(&format!("{}/api/v1/company/create-company", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    body["data"]["id"].as_str().unwrap().to_string()
}

/// Ties the account to a company so company-scoped endpoints resolve.
async fn join_company(app: &TestApp, email: &str, company_id: &str) {
    sqlx::query("UPDATE accounts SET company_id = $1::uuid WHERE email = $2")
        .bind(company_id)
        .bind(email)
        .execute(&app.db_pool)
        .await
        .unwrap();
}

// --- Companies ---

#[tokio::test]
async fn company_names_are_unique() {
    let app = spawn_app().await;
    let token = owner_token(&app, "acme@example.com").await;

    create_company(&app, &token, "Acme").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/v1/company/create-company", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Acme" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Company with this name already exists");
}

#[tokio::test]
async fn company_listing_is_paginated() {
    let app = spawn_app().await;
    let token = owner_token(&app, "pager@example.com").await;

    for i in 0..3 {
        create_company(&app, &token, &format!("Company {}", i)).await;
    }

    let response = reqwest::Client::new()
        .get(&format!(
            "{}/api/v1/company/get-company?page=1&limit=2",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["totalCompanies"], 3);
    assert_eq!(body["data"]["companies"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["totalPages"], 2);
    assert_eq!(body["data"]["hasNextPage"], true);
}

// --- Stores ---

#[tokio::test]
async fn store_creation_needs_a_company_in_play() {
    let app = spawn_app().await;
    let token = owner_token(&app, "storeless@example.com").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/api/v1/store/create-store", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Orphan Store" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Please select the company");
}

#[tokio::test]
async fn stores_by_company_join_names_and_carry_totals() {
    let app = spawn_app().await;
    let token = owner_token(&app, "chain@example.com").await;
    let company_id = create_company(&app, &token, "Chain Co").await;
    join_company(&app, "chain@example.com", &company_id).await;

    let client = reqwest::Client::new();
    let response = client
        .post(&format!("{}/api/v1/store/create-store", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Main Street" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    let response = client
        .post(&format!(
            "{}/api/v1/store/get-store-based-on-company",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["totalStores"], 1);
    assert_eq!(body["data"]["allStoreCount"], 1);
    let store = &body["data"]["stores"][0];
    assert_eq!(store["name"], "Main Street");
    assert_eq!(store["companyName"], "Chain Co");
    assert_eq!(store["createdByName"], "Owner");
}

// --- Audit questions and the auditing walk ---

#[tokio::test]
async fn auditing_walks_options_in_insertion_order() {
    let app = spawn_app().await;
    let token = owner_token(&app, "auditor@example.com").await;
    let company_id = create_company(&app, &token, "Audit Co").await;
    join_company(&app, "auditor@example.com", &company_id).await;

    let client = reqwest::Client::new();
    let response = client
        .post(&format!(
            "{}/api/v1/master/create-audit-question",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Hygiene check" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let question: Value = response.json().await.unwrap();
    let question_id = question["data"]["id"].as_str().unwrap().to_string();

    for prompt in ["Floors clean?", "Shelves stocked?"] {
        let response = client
            .post(&format!("{}/api/v1/master/create-option", app.address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({
                "questionId": question_id,
                "prompt": prompt,
                "responseOption": "Yes, No"
            }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, response.status().as_u16());
    }

    let response = client
        .get(&format!(
            "{}/api/v1/master/start-auditing/{}?index=0",
            app.address, question_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["option"]["prompt"], "Floors clean?");
    assert_eq!(body["data"]["totalOptions"], 2);
    assert_eq!(
        body["data"]["option"]["responseOptions"][0]["message"],
        "Yes"
    );

    let response = client
        .get(&format!(
            "{}/api/v1/master/start-auditing/{}?index=1",
            app.address, question_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["option"]["prompt"], "Shelves stocked?");

    // Past the end of the walk.
    let response = client
        .get(&format!(
            "{}/api/v1/master/start-auditing/{}?index=2",
            app.address, question_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No more questions");
}

#[tokio::test]
async fn assignment_marks_the_question_and_surfaces_it_to_staff() {
    let app = spawn_app().await;
    let token = owner_token(&app, "lead@example.com").await;
    let company_id = create_company(&app, &token, "Lead Co").await;
    join_company(&app, "lead@example.com", &company_id).await;

    let client = reqwest::Client::new();
    let response = client
        .post(&format!(
            "{}/api/v1/master/create-audit-question",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Safety round" }))
        .send()
        .await
        .unwrap();
    let question: Value = response.json().await.unwrap();
    let question_id = question["data"]["id"].as_str().unwrap().to_string();

    let response = client
        .post(&format!("{}/api/v1/users/register-user-staff", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "name": "Inspector",
            "email": "inspector@example.com",
            "password": "inspect1"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let staff: Value = response.json().await.unwrap();
    let staff_id = staff["data"]["id"].as_str().unwrap().to_string();

    let response = client
        .post(&format!(
            "{}/api/v1/master/assign-auditing/{}",
            app.address, question_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "userId": staff_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["isAssigned"], true);

    let response = client
        .post(&format!("{}/api/v1/users/login", app.address))
        .json(&json!({ "email": "inspector@example.com", "password": "inspect1" }))
        .send()
        .await
        .unwrap();
    let staff_login: Value = response.json().await.unwrap();
    let staff_token = staff_login["data"]["accessToken"].as_str().unwrap();

    let response = client
        .get(&format!("{}/api/v1/master/get-assigned-audits", app.address))
        .header("Authorization", format!("Bearer {}", staff_token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let assigned = body["data"].as_array().unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0]["name"], "Safety round");
}

#[tokio::test]
async fn response_submission_accepts_a_multipart_form_without_attachments() {
    let app = spawn_app().await;
    let token = owner_token(&app, "submitter@example.com").await;
    let company_id = create_company(&app, &token, "Submit Co").await;
    join_company(&app, "submitter@example.com", &company_id).await;

    let client = reqwest::Client::new();
    let response = client
        .post(&format!(
            "{}/api/v1/master/create-audit-question",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Closing checklist" }))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let question: Value = response.json().await.unwrap();
    let question_id = question["data"]["id"].as_str().unwrap().to_string();

    let form = reqwest::multipart::Form::new()
        .text("question", "Closing checklist")
        .text("response", "Yes")
        .text("score", "4.5")
        .text("message", "All clear")
        .text("auditQuestionId", question_id.clone());

    let response = client
        .post(&format!(
            "{}/api/v1/master/submit-audit-response",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["question"], "Closing checklist");
    assert_eq!(body["data"]["response"], "Yes");
    assert_eq!(body["data"]["score"], 4.5);
    assert_eq!(body["data"]["auditQuestionId"], question_id);
    assert_eq!(body["data"]["files"], json!([]));
    assert_eq!(body["data"]["photos"], json!([]));
    assert!(body["data"]["video"].is_null());

    let response = client
        .get(&format!("{}/api/v1/master/get-responses", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["totalResponses"], 1);
    assert_eq!(body["data"]["responses"][0]["message"], "All clear");
}

#[tokio::test]
async fn response_submission_requires_the_question_text() {
    let app = spawn_app().await;
    let token = owner_token(&app, "blanks@example.com").await;

    let form = reqwest::multipart::Form::new().text("response", "Yes");
    let response = reqwest::Client::new()
        .post(&format!(
            "{}/api/v1/master/submit-audit-response",
            app.address
        ))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "question is required");
}

// --- Demo requests ---

#[tokio::test]
async fn demo_request_intake_is_public_and_deduplicated() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let body = json!({
        "name": "Prospect",
        "email": "prospect@example.com",
        "companyName": "Prospect Inc",
        "companySize": "11-50"
    });

    let response = client
        .post(&format!("{}/api/v1/demoRequest/create", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["data"]["status"], "pending");
    assert!(created["data"]["followUpDate"].is_string());

    let response = client
        .post(&format!("{}/api/v1/demoRequest/create", app.address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn demo_request_listing_requires_an_admin() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/v1/demoRequest/get-all", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn soft_deleted_demo_requests_leave_the_listing() {
    let app = spawn_app().await;
    let token = owner_token(&app, "sales@example.com").await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/v1/demoRequest/create", app.address))
        .json(&json!({
            "name": "Short Lived",
            "email": "gone@example.com",
            "companyName": "Gone Inc",
            "companySize": "1-10"
        }))
        .send()
        .await
        .unwrap();
    let created: Value = response.json().await.unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = client
        .delete(&format!("{}/api/v1/demoRequest/delete/{}", app.address, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let response = client
        .get(&format!("{}/api/v1/demoRequest/get-all", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["totalDemoRequests"], 0);

    let response = client
        .get(&format!("{}/api/v1/demoRequest/get/{}", app.address, id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn demo_request_stats_count_by_status() {
    let app = spawn_app().await;
    let token = owner_token(&app, "stats@example.com").await;
    let client = reqwest::Client::new();

    for (email, status) in [("a@example.com", "pending"), ("b@example.com", "contacted")] {
        let response = client
            .post(&format!("{}/api/v1/demoRequest/create", app.address))
            .json(&json!({
                "name": "Lead",
                "email": email,
                "companyName": "Lead Inc",
                "companySize": "51-200"
            }))
            .send()
            .await
            .unwrap();
        let created: Value = response.json().await.unwrap();
        let id = created["data"]["id"].as_str().unwrap().to_string();

        if status != "pending" {
            let response = client
                .patch(&format!("{}/api/v1/demoRequest/update/{}", app.address, id))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "status": status }))
                .send()
                .await
                .unwrap();
            assert_eq!(200, response.status().as_u16());
        }
    }

    let response = client
        .get(&format!("{}/api/v1/demoRequest/stats", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["pending"], 1);
    assert_eq!(body["data"]["contacted"], 1);
}
