//! MIDI monitor, port listing and configuration dump

use anyhow::{Context, Result};
use colored::*;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::render_config;
use crate::discovery;
use crate::midi::{format_hex, Direction, LogEntry, MessageKind};
use crate::model::Configuration;
use crate::session::{EditorSession, Inbound};
use crate::transport::{MidiSink, PortLister};

/// How long `--dump` waits for the device to answer
pub const DUMP_TIMEOUT: Duration = Duration::from_secs(3);

const PORT_WIDTH: usize = 20;

fn direction_label(direction: Direction) -> ColoredString {
    match direction {
        Direction::In => "IN ".green(),
        Direction::Out => "OUT".red(),
    }
}

fn truncate_port(name: &str) -> String {
    if name.chars().count() > PORT_WIDTH {
        let head: String = name.chars().take(PORT_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

/// One colored monitor line: `[time] DIR PORT | HEX => SUMMARY`
pub fn format_entry(entry: &LogEntry) -> String {
    let hex = format_hex(&entry.data);
    let hex = match entry.kind {
        MessageKind::Note => hex.bright_green(),
        MessageKind::Cc => hex.bright_yellow(),
        MessageKind::SysEx => hex.bright_magenta(),
        MessageKind::Other => hex.bright_black(),
    };
    format!(
        "{} {} {:<width$} | {} => {}",
        format!("[{}]", entry.timestamp.format("%H:%M:%S%.3f")).dimmed(),
        direction_label(entry.direction),
        truncate_port(&entry.port),
        hex,
        entry.summary().bright_blue(),
        width = PORT_WIDTH
    )
}

/// Print available ports and the devices paired from them
pub fn list_ports_formatted(lister: &impl PortLister, marker: &str) -> Result<()> {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let inputs = lister.input_ports()?;
    println!("\n{}", "Input Ports:".bold());
    if inputs.is_empty() {
        println!("  {}", "No input ports found".dimmed());
    }
    for port in &inputs {
        println!("  {}: {}", port.index, port.name);
    }

    let outputs = lister.output_ports()?;
    println!("\n{}", "Output Ports:".bold());
    if outputs.is_empty() {
        println!("  {}", "No output ports found".dimmed());
    }
    for port in &outputs {
        println!("  {}: {}", port.index, port.name);
    }

    let devices = discovery::discover(lister, marker)?;
    if devices.is_empty() {
        println!("\n{}", format!("No device matching '{}'", marker).yellow());
    } else {
        println!("\n{}", format!("Detected '{}' devices:", marker).bold().bright_green());
        for device in devices {
            println!("  {}", device.name.bright_white());
            println!("    Input:  {}", device.input.name);
            println!("    Output: {}", device.output.name);
        }
    }
    println!();
    Ok(())
}

/// Print every message to and from the device until Ctrl+C
pub async fn run_monitor<S: MidiSink>(
    mut session: EditorSession<S>,
    mut inbound: mpsc::Receiver<Vec<u8>>,
) -> Result<()> {
    println!("{}", "=== V49 Monitor ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");
    println!(
        "{}",
        "Format: [timestamp] DIR PORT | HEX => PARSED".dimmed()
    );
    println!("{}\n", "─".repeat(80).dimmed());

    let mut activity = session.activity().subscribe();

    session.request_config()?;
    if let Some(entry) = session.log().last() {
        println!("{}", format_entry(entry));
    }

    loop {
        tokio::select! {
            Some(data) = inbound.recv() => {
                let result = session.handle_inbound(&data);
                if let Some(entry) = session.log().last() {
                    println!("{}", format_entry(entry));
                }
                match result {
                    Ok(Inbound::Config(_)) => println!("  {}", "configuration received".green()),
                    Ok(_) => {}
                    Err(e) => println!("  {} {}", "!".red(), e),
                }
            }
            Ok(()) = activity.changed() => {
                let current = *activity.borrow_and_update();
                match current {
                    Some(control) => println!("  {} {}", "active:".cyan(), control),
                    None => println!("  {}", "idle".dimmed()),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\n{}", "Monitor stopped".yellow());
    Ok(())
}

/// Query the device and wait for its configuration
pub async fn fetch_config<S: MidiSink>(
    session: &mut EditorSession<S>,
    inbound: &mut mpsc::Receiver<Vec<u8>>,
    timeout: Duration,
) -> Result<Configuration> {
    session.request_config()?;

    let wait = async {
        while let Some(data) = inbound.recv().await {
            match session.handle_inbound(&data) {
                Ok(Inbound::Config(config)) => return Some(config),
                Ok(_) => {}
                Err(e) => warn!("Ignoring bad reply: {}", e),
            }
        }
        None
    };

    tokio::time::timeout(timeout, wait)
        .await
        .context("Timed out waiting for configuration reply")?
        .context("MIDI input closed before a reply arrived")
}

/// Print the device configuration as YAML and exit
pub async fn run_dump<S: MidiSink>(
    mut session: EditorSession<S>,
    mut inbound: mpsc::Receiver<Vec<u8>>,
) -> Result<()> {
    let config = fetch_config(&mut session, &mut inbound, DUMP_TIMEOUT).await?;
    info!("Configuration read from {}", session.port_name());
    print!("{}", render_config(&config)?);
    Ok(())
}
