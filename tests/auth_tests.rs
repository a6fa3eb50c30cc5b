//! Token verification and channel authorization tests

use courier::auth::{Claims, TokenVerifier};
use courier::Error;
use jsonwebtoken::{encode, EncodingKey, Header};

const SECRET: &str = "integration-test-secret";

fn make_token(secret: &str, user_id: &str, exp_offset: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        user_id: user_id.to_string(),
        wallet_address: format!("wallet-{}", user_id),
        iat: now,
        exp: now + exp_offset,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn verifier() -> TokenVerifier {
    TokenVerifier::new(SECRET, "HS256", Vec::new()).unwrap()
}

#[test]
fn test_round_trip_claims() {
    let token = make_token(SECRET, "alice", 3600);
    let claims = verifier().verify(&token).unwrap();
    assert_eq!(claims.user_id, "alice");
    assert_eq!(claims.wallet_address, "wallet-alice");
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_expired_token_is_distinguished() {
    let token = make_token(SECRET, "alice", -60);
    assert!(matches!(
        verifier().verify(&token),
        Err(Error::TokenExpired)
    ));
}

#[test]
fn test_wrong_secret_is_invalid() {
    let token = make_token("some-other-secret", "alice", 3600);
    assert!(matches!(
        verifier().verify(&token),
        Err(Error::TokenInvalid(_))
    ));
}

#[test]
fn test_garbage_token_is_invalid() {
    for garbage in ["", "abc", "a.b", "a.b.c.d", "not a token at all"] {
        assert!(
            matches!(verifier().verify(garbage), Err(Error::TokenInvalid(_))),
            "{:?} should be invalid",
            garbage
        );
    }
}

#[test]
fn test_authorization_matrix() {
    let v = verifier();

    // (user, channel, expected)
    let cases = [
        ("alice", "global", true),
        ("alice", "user.alice", true),
        ("alice", "user.bob", false),
        ("bob", "user.bob", true),
        ("alice", "strategy.momentum-1", true),
        ("alice", "backtest.run-9", true),
        ("alice", "forge.job.j-17", true),
        ("alice", "trade", true),
        ("alice", "candles", true),
        ("alice", "payment", true),
        ("alice", "internal-admin", false),
        ("alice", "user.", false),
    ];

    for (user, channel, expected) in cases {
        assert_eq!(
            v.authorize(user, channel),
            expected,
            "authorize({}, {})",
            user,
            channel
        );
    }
}

#[test]
fn test_config_channels_extend_allow_list() {
    let v = TokenVerifier::new(SECRET, "HS256", vec!["metrics".to_string()]).unwrap();
    assert!(v.authorize("alice", "metrics"));
    assert!(!verifier().authorize("alice", "metrics"));
}

#[test]
fn test_hs384_and_hs512_supported() {
    for alg in ["HS384", "HS512"] {
        assert!(TokenVerifier::new(SECRET, alg, Vec::new()).is_ok());
    }
    assert!(TokenVerifier::new(SECRET, "ES256", Vec::new()).is_err());
}
