/// Decides whether a presented credential may use the admin surface.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, credential: &str) -> bool;
}

/// One shared upload password for every admin operation.
#[derive(Clone)]
pub struct SharedSecretAuthorizer {
    secret: String,
}

impl SharedSecretAuthorizer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authorizer for SharedSecretAuthorizer {
    fn authorize(&self, credential: &str) -> bool {
        !self.secret.is_empty() && credential == self.secret
    }
}

impl std::fmt::Debug for SharedSecretAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretAuthorizer")
            .field("secret", &"<redacted>")
            .finish()
    }
}
