use crate::device::DeviceKey;
use crate::envelope::MasterKey;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

#[derive(Debug)]
pub enum Action {
    Keygen,
    HashPassword {
        password: String,
    },
    VerifyPassword {
        password: String,
        hash: String,
    },
    TotpEnroll {
        account: String,
        issuer: String,
    },
    DeviceToken {
        device_key: DeviceKey,
    },
    RecoveryCodes,
    Encrypt {
        master_key: MasterKey,
        plaintext: String,
    },
    Decrypt {
        master_key: MasterKey,
        blob: String,
    },
}

impl Action {
    // Convenience wrapper so call sites can do `action.execute().await`.
    // When adding new actions, extend the match in `run::execute`.
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
