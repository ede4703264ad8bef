use tokio::task;

const DUMMY_SALT: [u8; 16] = *b"meter-login-salt";

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// BCrypt hashing off the async workers.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: String) -> Result<String, HashError> {
        let cost = self.cost;
        let hashed =
            task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    pub async fn verify(
        &self,
        password: String,
        hash: String,
    ) -> Result<bool, HashError> {
        let matches =
            task::spawn_blocking(move || bcrypt::verify(password, &hash))
                .await??;
        Ok(matches)
    }

    /// Spends one hash at the configured cost without checking anything,
    /// so a login for an unknown name costs as much as a wrong password.
    pub async fn burn(&self, password: String) -> Result<(), HashError> {
        let cost = self.cost;
        task::spawn_blocking(move || bcrypt::hash_with_salt(password, cost, DUMMY_SALT))
            .await??;
        Ok(())
    }
}
