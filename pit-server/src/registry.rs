use pit_core::types::UserId;
use rand::Rng;
use thiserror::Error;

/// Login failures surfaced to the HTTP client.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("incorrect password")]
    WrongPassword,
}

struct Account {
    password: String,
    user_id: UserId,
}

/// UserRegistry owns usernames, passwords, and user-id assignment. The
/// engine never sees names; the leaderboard joins them from here.
///
/// Both maps are concurrent: logins come from HTTP handler tasks while
/// the leaderboard reads names from its own thread.
pub struct UserRegistry {
    accounts: flurry::HashMap<String, Account>,
    names: flurry::HashMap<UserId, String>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            accounts: flurry::HashMap::new(),
            names: flurry::HashMap::new(),
        }
    }

    /// Logs a user in, creating the account on first sight.
    ///
    /// Returns the user's id and whether the account is new; a new
    /// account still needs registering on every book by the caller.
    pub fn login(&self, username: &str, password: &str) -> Result<(UserId, bool), LoginError> {
        let accounts = self.accounts.pin();
        if let Some(account) = accounts.get(username) {
            return if account.password == password {
                Ok((account.user_id, false))
            } else {
                Err(LoginError::WrongPassword)
            };
        }

        let user_id = self.claim_user_id(username);
        match accounts.try_insert(
            username.to_owned(),
            Account {
                password: password.to_owned(),
                user_id,
            },
        ) {
            Ok(_) => Ok((user_id, true)),
            // Lost a race creating the same username; defer to the winner.
            Err(occupied) => {
                self.names.pin().remove(&user_id);
                if occupied.current.password == password {
                    Ok((occupied.current.user_id, false))
                } else {
                    Err(LoginError::WrongPassword)
                }
            }
        }
    }

    /// The username behind a user id, if any.
    pub fn username(&self, user_id: UserId) -> Option<String> {
        self.names.pin().get(&user_id).cloned()
    }

    /// Records a display name for a user registered outside the login
    /// flow (the raw WebSocket REGISTER path). Existing names win.
    pub fn record_name(&self, user_id: UserId, username: &str) {
        let _ = self.names.pin().try_insert(user_id, username.to_owned());
    }

    /// Picks an unused random user id and records its username.
    fn claim_user_id(&self, username: &str) -> UserId {
        let names = self.names.pin();
        let mut rng = rand::rng();
        loop {
            let candidate: UserId = rng.random_range(1..UserId::MAX);
            if names.try_insert(candidate, username.to_owned()).is_ok() {
                return candidate;
            }
        }
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
