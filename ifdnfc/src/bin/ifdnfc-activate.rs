//! Command-line tool switching ifdnfc slots between modes
//!
//! Talks to pcscd over `SCardControl`: every reader whose name starts with
//! the given prefix receives the control request and its status is printed.

use std::ffi::CStr;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, ValueEnum};
use ifdnfc::constants::READER_NAME;
use ifdnfc::control::{ControlCommand, ControlRequest, ControlResponse};
use pcsc::{Card, Context, Protocols, Scope, ShareMode};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mode to set, or `status` to query
    #[arg(value_enum, default_value = "yes")]
    action: Action,

    /// Reader name prefix
    #[arg(default_value = READER_NAME)]
    prefix: String,

    /// Connection string sent with an activation (default: first USB device found)
    #[arg(short, long)]
    connstring: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Activate the slot
    Yes,
    /// Deactivate the slot
    No,
    /// Activate the slot with the secure element as card
    Se,
    /// Print the slot status
    Status,
}

impl From<Action> for ControlCommand {
    fn from(action: Action) -> Self {
        match action {
            Action::Yes => ControlCommand::SetActive,
            Action::No => ControlCommand::SetInactive,
            Action::Se => ControlCommand::SetActiveSe,
            Action::Status => ControlCommand::GetStatus,
        }
    }
}

fn send(card: &Card, request: &ControlRequest) -> Result<ControlResponse> {
    let mut rx = [0u8; ControlResponse::LEN];
    // IFDNFC_CTRL_ACTIVE
    let rsp = card
        .control(pcsc::ctl_code(1), &request.encode(), &mut rx)
        .with_context(|| format!("SCardControl error (command {})", request.command))?;
    Ok(ControlResponse::decode(rsp)?)
}

#[cfg(feature = "usb")]
fn scan_connstring() -> Result<String> {
    use ifdnfc::transport::{Backend, UsbBackend};
    use std::io::{self, Write};

    let ctx = UsbBackend::new().init()?;
    let mut devices = ctx.list_devices()?;
    match devices.len() {
        0 => bail!("unable to activate ifdnfc: no NFC device found"),
        1 => Ok(devices.remove(0)),
        n => {
            println!("{} NFC devices found, please select one:", n);
            for (i, d) in devices.iter().enumerate() {
                println!("[{}] {}", i, d);
            }
            print!(">> ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            let index: usize = line.trim().parse().context("value must be an integer")?;
            if index >= n {
                bail!("invalid index selection");
            }
            Ok(devices.remove(index))
        }
    }
}

#[cfg(not(feature = "usb"))]
fn scan_connstring() -> Result<String> {
    bail!("no --connstring given and no USB backend built in")
}

fn print_status(reader: &str, status: &ControlResponse) {
    println!(
        "Reader '{}', mode='{}', connected='{}', se='{}', connstring='{}'.",
        reader,
        status.mode_name(),
        if status.connected { "Yes" } else { "No" },
        if status.se_available { "Yes" } else { "No" },
        status.connstring
    );
}

fn run_reader(cli: &Cli, card: &Card, reader: &str) -> Result<()> {
    let command = ControlCommand::from(cli.action);
    let mut connstring = String::new();

    if matches!(cli.action, Action::Yes | Action::Se) {
        if cli.prefix == READER_NAME {
            // single reader setup: the connection string is not in pcscd's
            // DEVICENAME, so it has to be sent along
            send(card, &ControlRequest::new(ControlCommand::SetInactive, ""))?;
            connstring = match &cli.connstring {
                Some(s) => s.clone(),
                None => scan_connstring()?,
            };
            println!("Reader '{}', activating ifdnfc with '{}'.", reader, connstring);
        } else {
            println!(
                "Reader '{}', activating ifdnfc using the connection string in pcscd DEVICENAME.",
                reader
            );
        }
    }

    let status = send(card, &ControlRequest::new(command, connstring))?;
    print_status(reader, &status);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let ctx = Context::establish(Scope::System).context("SCardEstablishContext")?;
    let readers = ctx.list_readers_owned().context("SCardListReaders")?;

    let mut found = 0;
    for reader in readers.iter().map(|r| r.as_c_str()) {
        let name = reader.to_string_lossy();
        if !name.starts_with(&cli.prefix) {
            log::debug!("skipping reader '{}'", name);
            continue;
        }
        found += 1;

        let card = match connect(&ctx, reader) {
            Ok(card) => card,
            Err(e) => {
                println!("Reader '{}', {:#}", name, e);
                continue;
            }
        };
        if let Err(e) = run_reader(&cli, &card, &name) {
            println!("Reader '{}', {:#}", name, e);
        }
    }

    if found == 0 {
        bail!(
            "could not find any PC/SC reader with name prefix '{}', check your configuration",
            cli.prefix
        );
    }
    Ok(())
}

fn connect(ctx: &Context, reader: &CStr) -> Result<Card> {
    ctx.connect(reader, ShareMode::Direct, Protocols::UNDEFINED)
        .context("SCardConnect")
}
