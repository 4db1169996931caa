use crate::application_port::{
    AccessToken, AccessTokenData, AuthError, RefreshToken, RefreshTokenData, TokenCodec,
};
use crate::domain_model::{Role, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

/// Access claims carry the subject's identity; no jti, no session state.
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String, // user id as string
    email: String,
    role: Role,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

/// Refresh claims deliberately omit email/role and require a jti, so the
/// two shapes are mutually non-deserializable.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String, // user id as string
    jti: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

fn encode_access(
    uid: UserId,
    email: &str,
    role: Role,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.access_ttl;
    let claims = AccessClaims {
        sub: uid.to_string(),
        email: email.to_string(),
        role,
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn encode_refresh(
    uid: UserId,
    jti: &str,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + cfg.refresh_ttl;
    let claims = RefreshClaims {
        sub: uid.to_string(),
        jti: jti.to_string(),
        exp: exp_dt.timestamp(),
        iat: iat_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn validation(cfg: &JwtConfig, validate_exp: bool) -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = validate_exp;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    v
}

fn decode_access(token: &str, cfg: &JwtConfig) -> Result<AccessClaims, AuthError> {
    let v = validation(cfg, true);
    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;
    Ok(data.claims)
}

fn decode_refresh(
    token: &str,
    cfg: &JwtConfig,
    validate_exp: bool,
) -> Result<RefreshClaims, AuthError> {
    let v = validation(cfg, validate_exp);
    let data = decode::<RefreshClaims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_access(user_id, email, role, &self.cfg)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        user_id: UserId,
        jti: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = encode_refresh(user_id, jti, &self.cfg)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<AccessTokenData, AuthError> {
        let claims = decode_access(&token.0, &self.cfg)?;
        Ok(AccessTokenData {
            user_id: Self::parse_user_id(&claims.sub)?,
            email: claims.email,
            role: claims.role,
        })
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenData, AuthError> {
        let claims = decode_refresh(&token.0, &self.cfg, true)?;
        Ok(RefreshTokenData {
            user_id: Self::parse_user_id(&claims.sub)?,
            jti: claims.jti,
        })
    }

    async fn decode_refresh_ignoring_expiry(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenData, AuthError> {
        let claims = decode_refresh(&token.0, &self.cfg, false)?;
        Ok(RefreshTokenData {
            user_id: Self::parse_user_id(&claims.sub)?,
            jti: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cfg() -> JwtConfig {
        JwtConfig {
            issuer: "gatehouse.auth".to_string(),
            audience: "gatehouse-clients".to_string(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(7200),
            signing_key: b"test-signing-key-of-decent-length".to_vec(),
        }
    }

    fn codec() -> JwtHs256Codec {
        JwtHs256Codec::new(test_cfg())
    }

    fn user_id() -> UserId {
        UserId(uuid::Uuid::new_v4())
    }

    #[tokio::test]
    async fn access_token_round_trips() {
        let codec = codec();
        let uid = user_id();
        let (token, exp) = codec
            .issue_access_token(uid, "alice@example.com", Role::Admin)
            .await
            .unwrap();
        assert!(exp > Utc::now());

        let data = codec.verify_access_token(&token).await.unwrap();
        assert_eq!(data.user_id, uid);
        assert_eq!(data.email, "alice@example.com");
        assert_eq!(data.role, Role::Admin);
    }

    #[tokio::test]
    async fn refresh_token_round_trips() {
        let codec = codec();
        let uid = user_id();
        let (token, _) = codec.issue_refresh_token(uid, "jti-1").await.unwrap();

        let data = codec.verify_refresh_token(&token).await.unwrap();
        assert_eq!(data.user_id, uid);
        assert_eq!(data.jti, "jti-1");
    }

    #[tokio::test]
    async fn claim_shapes_are_mutually_exclusive() {
        let codec = codec();
        let uid = user_id();
        let (access, _) = codec
            .issue_access_token(uid, "alice@example.com", Role::Customer)
            .await
            .unwrap();
        let (refresh, _) = codec.issue_refresh_token(uid, "jti-1").await.unwrap();

        let err = codec
            .verify_refresh_token(&RefreshToken(access.0.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        let err = codec
            .verify_access_token(&AccessToken(refresh.0.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let cfg = test_cfg();
        let uid = user_id();
        // Two hours in the past, well beyond the library's leeway.
        let iat = Utc::now().timestamp() - 10_000;
        let claims = AccessClaims {
            sub: uid.to_string(),
            email: "alice@example.com".to_string(),
            role: Role::Customer,
            exp: iat + 1,
            iat,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&cfg.signing_key),
        )
        .unwrap();

        let err = JwtHs256Codec::new(cfg)
            .verify_access_token(&AccessToken(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let codec_a = codec();
        let mut other = test_cfg();
        other.signing_key = b"a-completely-different-signing-key".to_vec();
        let codec_b = JwtHs256Codec::new(other);

        let (token, _) = codec_a.issue_refresh_token(user_id(), "jti-1").await.unwrap();
        let err = codec_b.verify_refresh_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn logout_decode_accepts_expired_refresh_token() {
        let cfg = test_cfg();
        let uid = user_id();
        let iat = Utc::now().timestamp() - 10_000;
        let claims = RefreshClaims {
            sub: uid.to_string(),
            jti: "jti-old".to_string(),
            exp: iat + 1,
            iat,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
        };
        let token = RefreshToken(
            encode(
                &Header::new(Algorithm::HS256),
                &claims,
                &EncodingKey::from_secret(&cfg.signing_key),
            )
            .unwrap(),
        );

        let codec = JwtHs256Codec::new(cfg);
        let err = codec.verify_refresh_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));

        let data = codec.decode_refresh_ignoring_expiry(&token).await.unwrap();
        assert_eq!(data.user_id, uid);
        assert_eq!(data.jti, "jti-old");
    }
}
