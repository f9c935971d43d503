use crate::cli::actions::Action;
use crate::device::DeviceKey;
use crate::envelope::MasterKey;
use anyhow::{Context, Result};

/// Map parsed arguments to an [`Action`].
///
/// Key material is decoded and length-checked here, before any action runs,
/// so a missing or malformed key aborts startup instead of failing
/// mid-operation.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("keygen", _)) => Ok(Action::Keygen),

        Some(("hash-password", sub)) => {
            let password = sub
                .get_one::<String>("password")
                .cloned()
                .context("missing required argument: password")?;
            Ok(Action::HashPassword { password })
        }

        Some(("verify-password", sub)) => {
            let password = sub
                .get_one::<String>("password")
                .cloned()
                .context("missing required argument: password")?;
            let hash = sub
                .get_one::<String>("hash")
                .cloned()
                .context("missing required argument: hash")?;
            Ok(Action::VerifyPassword { password, hash })
        }

        Some(("totp-enroll", sub)) => {
            let account = sub
                .get_one::<String>("account")
                .cloned()
                .context("missing required argument: --account")?;
            let issuer = sub
                .get_one::<String>("issuer")
                .cloned()
                .context("missing required argument: --issuer")?;
            Ok(Action::TotpEnroll { account, issuer })
        }

        Some(("device-token", _)) => {
            let device_key = device_key(matches)?;
            Ok(Action::DeviceToken { device_key })
        }

        Some(("recovery-codes", _)) => Ok(Action::RecoveryCodes),

        Some(("encrypt", sub)) => {
            let plaintext = sub
                .get_one::<String>("plaintext")
                .cloned()
                .context("missing required argument: plaintext")?;
            let master_key = master_key(matches)?;
            Ok(Action::Encrypt {
                master_key,
                plaintext,
            })
        }

        Some(("decrypt", sub)) => {
            let blob = sub
                .get_one::<String>("blob")
                .cloned()
                .context("missing required argument: blob")?;
            let master_key = master_key(matches)?;
            Ok(Action::Decrypt { master_key, blob })
        }

        _ => Err(anyhow::anyhow!("no subcommand provided")),
    }
}

fn master_key(matches: &clap::ArgMatches) -> Result<MasterKey> {
    let hex_key = matches
        .get_one::<String>("master-key")
        .context("missing required SIGILO_MASTER_KEY / --master-key")?;
    MasterKey::from_hex(hex_key).context("invalid SIGILO_MASTER_KEY")
}

fn device_key(matches: &clap::ArgMatches) -> Result<DeviceKey> {
    let hex_key = matches
        .get_one::<String>("device-key")
        .context("missing required SIGILO_DEVICE_KEY / --device-key")?;
    DeviceKey::from_hex(hex_key).context("invalid SIGILO_DEVICE_KEY")
}
