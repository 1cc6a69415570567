//! Command-line interface for machoinfo.
//!
//! Prints the signing identity, entitlements and capabilities of an iOS
//! executable, optionally together with its bundle's Info.plist.

use clap::{ArgAction, Parser};
use machoinfo::{Inspector, MachoInfo};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "machoinfo")]
#[command(about = "Inspect the code signature of an iOS executable")]
struct Cli {
    /// Mach-O executable (thin or FAT)
    binary: PathBuf,

    /// Info.plist of the bundle containing the executable
    #[arg(short = 'i', long)]
    info_plist: Option<PathBuf>,

    /// Print the raw entitlements plist
    #[arg(short, long)]
    entitlements: bool,

    /// Print the signing certificate as PEM
    #[arg(long)]
    pem: bool,

    /// List every certificate in the signature
    #[arg(long)]
    chain: bool,

    /// Chain position of the signing certificate
    #[arg(long, default_value = "2")]
    signer_index: usize,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let inspector = Inspector::new().signer_index(cli.signer_index);
    let info = match cli.info_plist {
        Some(ref plist) => inspector.inspect_app_files(plist, &cli.binary)?,
        None => inspector.inspect_file(&cli.binary)?,
    };

    print_summary(&info);

    if cli.chain {
        println!("Certificates:");
        for (i, cert) in info.certificates.iter().enumerate() {
            let name = cert.subject_common_name().unwrap_or_else(|| "<no common name>".into());
            println!("  [{i}] {name}");
        }
    }

    if cli.entitlements {
        match info.entitlements {
            Some(ref text) => println!("{text}"),
            None => println!("No entitlements"),
        }
    }

    if cli.pem {
        match info.certificate_pem {
            Some(ref pem) => print!("{pem}"),
            None => println!("No signing certificate"),
        }
    }

    Ok(())
}

fn print_summary(info: &MachoInfo) {
    if let Some(ref plist) = info.info_plist {
        if let Some(name) = Inspector::executable_name(plist) {
            println!("Executable: {name}");
        }
    }
    if let Some(ref icon) = info.icon {
        println!("Icon: {icon}");
    }

    if !info.is_signed() {
        println!("Signature: none");
        return;
    }

    println!(
        "Signed by: {}",
        info.common_name.as_deref().unwrap_or("<unknown>")
    );

    let capabilities = info.capabilities();
    if capabilities.is_empty() {
        println!("Capabilities: none");
    } else {
        println!("Capabilities: {}", capabilities.join(", "));
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}
