//! Auth and user services against a mock backend.

use std::sync::Arc;

use athus_core::auth::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use athus_core::models::{ProfileUpdate, SignUpPayload, User};
use athus_core::{
    ApiError, AuthClient, AuthService, MemoryStore, Session, SessionEvent, TokenStore,
    UserService,
};
use mockito::{Matcher, Server};
use serde_json::json;

fn setup(base_url: &str) -> (AuthClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(Session::new(store.clone()));
    (AuthClient::new(base_url, session).unwrap(), store)
}

const LOGIN_BODY: &str = r#"{
    "body": {
        "accessToken": "A1",
        "refreshToken": "R1",
        "id": 5,
        "nome": "Ana Souza",
        "email": "ana@example.com",
        "ativo": true
    }
}"#;

#[tokio::test]
async fn test_login_stores_pair_and_user() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(
            json!({"email": "ana@example.com", "senha": "segredo"}),
        ))
        .with_status(200)
        .with_body(LOGIN_BODY)
        .create_async()
        .await;

    let (client, store) = setup(&server.url());
    let mut events = client.subscribe();
    let auth = AuthService::new(client.clone());

    let outcome = auth.login("ana@example.com", "segredo").await.unwrap();

    assert!(outcome.tokens_issued);
    assert_eq!(outcome.user.as_ref().map(|u| u.id), Some(5));
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("A1"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R1"));
    let cached = client.session().user().unwrap().unwrap();
    assert_eq!(cached.nome, "Ana Souza");
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedIn);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_login_without_tokens_keeps_session_empty() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(r#"{"body":{"mensagem":"verifique seu email"}}"#)
        .create_async()
        .await;

    let (client, store) = setup(&server.url());
    let auth = AuthService::new(client);

    let outcome = auth.login("ana@example.com", "segredo").await.unwrap();

    assert!(!outcome.tokens_issued);
    assert!(outcome.user.is_none());
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_sign_up_conflict() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/cadastrar")
        .match_body(Matcher::Json(json!({
            "nomeCompleto": "Ana Souza",
            "email": "ana@example.com",
            "senha": "segredo"
        })))
        .with_status(409)
        .with_body("email já cadastrado")
        .create_async()
        .await;

    let (client, _) = setup(&server.url());
    let auth = AuthService::new(client);
    let payload = SignUpPayload {
        nome_completo: "Ana Souza".to_string(),
        email: "ana@example.com".to_string(),
        senha: "segredo".to_string(),
    };

    let err = auth.sign_up(&payload).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(ref body) if body == "email já cadastrado"));
}

#[tokio::test]
async fn test_verify_email() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/validarcodigo")
        .match_body(Matcher::Json(
            json!({"email": "ana@example.com", "codigo": "123456"}),
        ))
        .with_status(200)
        .with_body(r#"{"body":"ok"}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, _) = setup(&server.url());
    let auth = AuthService::new(client);

    let err = auth.verify_email("ana@example.com", "12a456").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
    let err = auth.verify_email("ana@example.com", "12345").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));

    let value = auth.verify_email("ana@example.com", " 123456 ").await.unwrap();
    assert_eq!(value["body"], "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_google_login_fetches_user() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/oauth2/google/autenticado")
        .match_body(Matcher::Json(json!({"access_token": "g-token"})))
        .with_status(200)
        .with_body(r#"{"body":{"accessToken":"A1","refreshToken":"R1","id":5}}"#)
        .create_async()
        .await;
    let user = server
        .mock("GET", "/usuarios/5")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_body(r#"{"id":5,"nome":"Ana Souza","email":"ana@example.com"}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, store) = setup(&server.url());
    let auth = AuthService::new(client.clone());

    let outcome = auth.login_with_google("g-token").await.unwrap();

    assert!(outcome.tokens_issued);
    assert_eq!(outcome.user.unwrap().email, "ana@example.com");
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("A1"));
    assert!(store.get(USER_KEY).unwrap().is_some());
    user.assert_async().await;
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let server = Server::new_async().await;
    let (client, store) = setup(&server.url());
    store.set(AUTH_TOKEN_KEY, "A1").unwrap();
    store.set(REFRESH_TOKEN_KEY, "R1").unwrap();
    store.set(USER_KEY, "{}").unwrap();
    let mut events = client.subscribe();

    AuthService::new(client.clone()).logout().unwrap();

    assert!(!client.session().is_authenticated());
    assert_eq!(store.get(USER_KEY).unwrap(), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn test_get_user_accepts_enveloped_and_bare() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/usuarios/5")
        .with_status(200)
        .with_body(r#"{"body":{"id":5,"nome":"Ana Souza","email":"ana@example.com"}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/usuarios/6")
        .with_status(200)
        .with_body(r#"{"id":6,"nome":"Bruno Lima","email":"bruno@example.com"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/usuarios/7")
        .with_status(404)
        .create_async()
        .await;

    let (client, _) = setup(&server.url());
    let users = UserService::new(client);

    assert_eq!(users.get_user(5).await.unwrap().nome, "Ana Souza");
    assert_eq!(users.get_user(6).await.unwrap().nome, "Bruno Lima");
    assert!(matches!(
        users.get_user(7).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_update_user_sends_partial_and_merges_cache() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/usuarios")
        .match_header("authorization", "Bearer A1")
        .match_body(Matcher::Json(json!({"cidade": "Recife", "numero": 120})))
        .with_status(200)
        .create_async()
        .await;

    let (client, store) = setup(&server.url());
    store.set(AUTH_TOKEN_KEY, "A1").unwrap();
    store.set(REFRESH_TOKEN_KEY, "R1").unwrap();
    let mut user = User::new(5, "Ana Souza", "ana@example.com");
    user.estado = Some("PE".to_string());
    client.session().store_user(&user).unwrap();

    let users = UserService::new(client);
    let update = ProfileUpdate {
        cidade: Some("Recife".to_string()),
        numero: Some(120),
        ..Default::default()
    };
    users.update_user(&update).await.unwrap();

    let cached = users.current_user().unwrap().unwrap();
    assert_eq!(cached.cidade.as_deref(), Some("Recife"));
    assert_eq!(cached.numero, Some(120));
    assert_eq!(cached.estado.as_deref(), Some("PE"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_update_is_rejected_locally() {
    let (client, _) = setup("http://127.0.0.1:9");
    let users = UserService::new(client);

    let err = users.update_user(&ProfileUpdate::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
}
