use crate::cli::actions::Action;
use crate::{device::DeviceTokenSigner, envelope::Envelope, password, recovery, totp};
use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Keygen => keygen(),

        Action::HashPassword { password } => {
            let hash = password::hash(&password).context("failed to hash password")?;
            println!("{hash}");
            Ok(())
        }

        Action::VerifyPassword { password, hash } => {
            let valid = password::verify(&password, &hash).context("unusable stored hash")?;
            println!("{}", if valid { "ok" } else { "mismatch" });
            if valid {
                Ok(())
            } else {
                Err(anyhow::anyhow!("password does not match"))
            }
        }

        Action::TotpEnroll { account, issuer } => {
            let secret = totp::generate_secret(totp::DEFAULT_SECRET_BYTES)
                .context("failed to generate totp secret")?;
            let uri = totp::Provisioning::new(&secret, &account, &issuer)
                .uri()
                .context("failed to build provisioning uri")?;
            println!("secret: {secret}");
            println!("uri:    {uri}");
            Ok(())
        }

        Action::DeviceToken { device_key } => {
            let signer = DeviceTokenSigner::new(device_key);
            let issued = signer.generate().context("failed to issue device token")?;
            let cookie = signer.cookie_value(&issued.device_id, &issued.token);
            println!("device_id:  {}", issued.device_id);
            println!("token_hash: {}", issued.token_hash);
            println!("expires_at: {}", issued.expires_at.to_rfc3339());
            println!("cookie:     {cookie}");
            Ok(())
        }

        Action::RecoveryCodes => {
            let codes = recovery::generate_batch().context("failed to generate recovery codes")?;
            for code in &codes {
                let hash = recovery::hash_code(code)
                    .context("generated code failed normalization")?;
                println!("{code}  {hash}");
            }
            Ok(())
        }

        Action::Encrypt {
            master_key,
            plaintext,
        } => {
            let blob = Envelope::new(master_key)
                .encrypt(&plaintext)
                .context("encryption failed")?;
            println!("{blob}");
            Ok(())
        }

        Action::Decrypt { master_key, blob } => {
            let plaintext = Envelope::new(master_key)
                .decrypt(&blob)
                .context("decryption failed")?;
            println!("{plaintext}");
            Ok(())
        }
    }
}

/// Print fresh 32-byte hex keys for the two required configuration inputs.
fn keygen() -> Result<()> {
    let mut master = [0u8; 32];
    let mut device = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut master)
        .context("random source failed")?;
    OsRng
        .try_fill_bytes(&mut device)
        .context("random source failed")?;

    println!("SIGILO_MASTER_KEY={}", hex::encode(master));
    println!("SIGILO_DEVICE_KEY={}", hex::encode(device));
    Ok(())
}
