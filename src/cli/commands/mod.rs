use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("sigilo")
        .about("Authentication and secrets-security core")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("master-key")
                .long("master-key")
                .help("Master encryption key, 64 hex characters (32 bytes)")
                .env("SIGILO_MASTER_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new("device-key")
                .long("device-key")
                .help("Device-token signing key, 64 hex characters (32 bytes)")
                .env("SIGILO_DEVICE_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("SIGILO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(Command::new("keygen").about("Generate fresh master and device signing keys"))
        .subcommand(
            Command::new("hash-password")
                .about("Hash a password for storage (scrypt, self-describing format)")
                .arg(Arg::new("password").help("Password to hash").required(true)),
        )
        .subcommand(
            Command::new("verify-password")
                .about("Verify a password against a stored hash")
                .arg(Arg::new("password").help("Password to check").required(true))
                .arg(Arg::new("hash").help("Stored hash string").required(true)),
        )
        .subcommand(
            Command::new("totp-enroll")
                .about("Generate a TOTP secret and its provisioning URI")
                .arg(
                    Arg::new("account")
                        .long("account")
                        .help("Account label, usually the admin email")
                        .required(true),
                )
                .arg(
                    Arg::new("issuer")
                        .long("issuer")
                        .help("Issuer label shown in authenticator apps")
                        .default_value("Sigilo"),
                ),
        )
        .subcommand(
            Command::new("device-token")
                .about("Issue a remember-device credential and its signed cookie value"),
        )
        .subcommand(
            Command::new("recovery-codes")
                .about("Generate a batch of recovery codes and their storage hashes"),
        )
        .subcommand(
            Command::new("encrypt")
                .about("Encrypt a secret string under the master key")
                .arg(Arg::new("plaintext").help("Secret to encrypt").required(true)),
        )
        .subcommand(
            Command::new("decrypt")
                .about("Decrypt a stored ciphertext blob")
                .arg(Arg::new("blob").help("Base64 blob to decrypt").required(true)),
        )
}
