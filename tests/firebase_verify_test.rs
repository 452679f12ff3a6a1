//! Firebase ID token verification against a fixture signing key

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use prototype_api::auth::{
    AccessGate, AuthError, FirebaseVerifier, GateMode, Identity, IdentityVerifier,
    VerificationError,
};
use prototype_api::config::AuthSection;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT_ID: &str = "demo-project";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn auth_section() -> AuthSection {
    AuthSection {
        enabled: true,
        service_account_json: Some(
            serde_json::json!({
                "type": "service_account",
                "project_id": PROJECT_ID,
                "client_email": "firebase-adminsdk@demo-project.iam.gserviceaccount.com"
            })
            .to_string(),
        ),
        jwks_json: Some(include_str!("fixtures/test_jwks.json").to_string()),
        clock_skew_secs: 0,
        ..Default::default()
    }
}

fn sign(kid: &str, claims: serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(include_bytes!("fixtures/test_rsa_private.pem"))
            .expect("private key must parse"),
    )
    .expect("token encode should succeed")
}

fn valid_claims(sub: &str) -> serde_json::Value {
    serde_json::json!({
        "iss": format!("https://securetoken.google.com/{}", PROJECT_ID),
        "aud": PROJECT_ID,
        "sub": sub,
        "iat": now() - 10,
        "exp": now() + 3600,
    })
}

#[tokio::test]
async fn test_valid_token_yields_subject() {
    let verifier = FirebaseVerifier::from_config(&auth_section()).expect("verifier init");
    let token = sign("test-kid", valid_claims("user_42"));

    let subject = verifier.verify(&token).await.expect("token should verify");
    assert_eq!(subject, "user_42");
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let verifier = FirebaseVerifier::from_config(&auth_section()).unwrap();

    let mut claims = valid_claims("user_42");
    claims["aud"] = serde_json::json!("other-project");
    let token = sign("test-kid", claims);

    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(err, VerificationError::Rejected(_)));
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() {
    let verifier = FirebaseVerifier::from_config(&auth_section()).unwrap();

    let mut claims = valid_claims("user_42");
    claims["iss"] = serde_json::json!("https://accounts.example.com");
    let token = sign("test-kid", claims);

    assert!(verifier.verify(&token).await.is_err());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let verifier = FirebaseVerifier::from_config(&auth_section()).unwrap();

    let mut claims = valid_claims("user_42");
    claims["iat"] = serde_json::json!(now() - 7200);
    claims["exp"] = serde_json::json!(now() - 3600);
    let token = sign("test-kid", claims);

    assert!(verifier.verify(&token).await.is_err());
}

#[tokio::test]
async fn test_unknown_kid_is_rejected() {
    let verifier = FirebaseVerifier::from_config(&auth_section()).unwrap();
    let token = sign("rotated-away", valid_claims("user_42"));

    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(err, VerificationError::Rejected(_)));
}

#[tokio::test]
async fn test_gate_collapses_provider_failures() {
    let gate = AccessGate::from_config(&auth_section());
    assert!(gate.is_enabled());

    let token = sign("test-kid", valid_claims("user_42"));
    let header = format!("Bearer {}", token);
    let identity = gate.authenticate(Some(header.as_str())).await.unwrap();
    assert_eq!(identity, Identity::Subject("user_42".to_string()));

    let mut expired = valid_claims("user_42");
    expired["exp"] = serde_json::json!(now() - 3600);
    let expired = format!("Bearer {}", sign("test-kid", expired));
    assert_eq!(
        gate.authenticate(Some(expired.as_str())).await,
        Err(AuthError::InvalidCredential)
    );

    let wrong_scheme = format!("Token {}", token);
    assert_eq!(
        gate.authenticate(Some(wrong_scheme.as_str())).await,
        Err(AuthError::InvalidScheme)
    );
}

#[tokio::test]
async fn test_unreachable_key_endpoint_is_invalid_credential() {
    let section = AuthSection {
        jwks_json: None,
        jwks_url: "http://127.0.0.1:1/jwks".to_string(),
        ..auth_section()
    };
    let verifier = FirebaseVerifier::from_config(&section).unwrap();
    let token = sign("test-kid", valid_claims("user_42"));

    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(err, VerificationError::KeysUnavailable(_)));

    let gate = AccessGate::new(GateMode::Enabled(Arc::new(verifier)));
    let header = format!("Bearer {}", token);
    assert_eq!(
        gate.authenticate(Some(header.as_str())).await,
        Err(AuthError::InvalidCredential)
    );
}

#[tokio::test]
async fn test_remote_keys_are_fetched_once_and_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(include_str!("fixtures/test_jwks.json")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let section = AuthSection {
        jwks_json: None,
        jwks_url: format!("{}/jwks", server.uri()),
        jwks_refresh_secs: 3600,
        ..auth_section()
    };
    let verifier = FirebaseVerifier::from_config(&section).unwrap();

    let first = verifier
        .verify(&sign("test-kid", valid_claims("u1")))
        .await
        .unwrap();
    let second = verifier
        .verify(&sign("test-kid", valid_claims("u2")))
        .await
        .unwrap();
    assert_eq!(first, "u1");
    assert_eq!(second, "u2");

    // A fresh cache answers unknown kids without going back to the endpoint
    let err = verifier
        .verify(&sign("other", valid_claims("u3")))
        .await
        .unwrap_err();
    assert!(matches!(err, VerificationError::Rejected(_)));

    server.verify().await;
}
