//! Command-line interface and REPL
//!
//! Lines are read on a blocking thread and forwarded to the session loop,
//! which owns the device connection and answers each request with the text
//! to print.

use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::str::FromStr;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::StateError;
use crate::model::{
    ButtonUpdate, Configuration, KeysUpdate, KnobUpdate, ModWheelUpdate, PadUpdate,
    PitchWheelUpdate, SustainUpdate,
};
use crate::session::{EditorSession, Inbound};
use crate::state::StateStore;
use crate::transport::MidiSink;

const PROMPT: &str = "v49> ";

const HELP: &str = "\
Commands:
  show                          print the held configuration
  query                         request the configuration from the device
  send                          write the held configuration to the device
  keys <field=value>...         base_note octave channel velocity_curve
  pitch <field=value>...        channel
  mod <field=value>...          channel cc min max
  sustain <field=value>...      cc min max channel
  knob <n> <field=value>...     mode(cc|aftertouch) cc min max channel
  pad <n> <field=value>...      mode(note|toggle_cc|momentary_cc) note_or_cc fixed_or_min velocity_or_max channel
  button <n> <field=value>...   mode(toggle|momentary) cc on off channel
  log                           print the message log
  clear                         clear the message log
  help                          show this help
  quit                          exit";

/// Edit to one section of the configuration; indices are zero-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Keys(KeysUpdate),
    PitchWheel(PitchWheelUpdate),
    ModWheel(ModWheelUpdate),
    Sustain(SustainUpdate),
    Knob(usize, KnobUpdate),
    Pad(usize, PadUpdate),
    Button(usize, ButtonUpdate),
}

impl Edit {
    pub fn apply(&self, store: &StateStore) -> Result<(), StateError> {
        match self {
            Edit::Keys(u) => store.update_keys(*u),
            Edit::PitchWheel(u) => store.update_pitch_wheel(*u),
            Edit::ModWheel(u) => store.update_mod_wheel(*u),
            Edit::Sustain(u) => store.update_sustain(*u),
            Edit::Knob(i, u) => store.update_knob(*i, *u),
            Edit::Pad(i, u) => store.update_pad(*i, *u),
            Edit::Button(i, u) => store.update_button(*i, *u),
        }
    }

    fn describe(&self) -> String {
        match self {
            Edit::Keys(_) => "keys".to_string(),
            Edit::PitchWheel(_) => "pitch wheel".to_string(),
            Edit::ModWheel(_) => "mod wheel".to_string(),
            Edit::Sustain(_) => "sustain".to_string(),
            Edit::Knob(i, _) => format!("knob {}", i + 1),
            Edit::Pad(i, _) => format!("pad {}", i + 1),
            Edit::Button(i, _) => format!("button {}", i + 1),
        }
    }
}

/// Parsed REPL command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Show,
    Query,
    Send,
    Edit(Edit),
    Log,
    Clear,
    Help,
    Quit,
}

/// A command forwarded to the session loop, answered with printable text
pub struct Request {
    pub command: ReplCommand,
    pub reply: oneshot::Sender<String>,
}

fn parse_u8(field: &str, value: &str) -> Result<u8> {
    value
        .parse()
        .with_context(|| format!("{} expects a number, got '{}'", field, value))
}

fn parse_mode<M>(value: &str) -> Result<M>
where
    M: FromStr,
    M::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(value.parse::<M>()?)
}

/// Split `field=value` pairs
fn assignments<'a>(args: &[&'a str]) -> Result<Vec<(&'a str, &'a str)>> {
    if args.is_empty() {
        bail!("expected at least one field=value");
    }
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(f, v)| (f.trim(), v.trim()))
                .ok_or_else(|| anyhow!("expected field=value, got '{}'", arg))
        })
        .collect()
}

/// Parse a one-based control number into a zero-based index
fn control_index(entity: &str, args: &[&str]) -> Result<usize> {
    let n: usize = args
        .first()
        .ok_or_else(|| anyhow!("{} needs a number, e.g. '{} 1 cc=20'", entity, entity))?
        .parse()
        .with_context(|| format!("invalid {} number", entity))?;
    n.checked_sub(1)
        .ok_or_else(|| anyhow!("{} numbers start at 1", entity))
}

fn unknown_field(entity: &str, field: &str) -> anyhow::Error {
    anyhow!("unknown {} field '{}'", entity, field)
}

fn parse_keys(args: &[&str]) -> Result<KeysUpdate> {
    let mut u = KeysUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "base_note" => u.base_note = Some(parse_u8(field, value)?),
            "octave" => u.octave = Some(parse_u8(field, value)?),
            "channel" => u.channel = Some(parse_u8(field, value)?),
            "velocity_curve" => u.velocity_curve = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("keys", field)),
        }
    }
    Ok(u)
}

fn parse_pitch(args: &[&str]) -> Result<PitchWheelUpdate> {
    let mut u = PitchWheelUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "channel" => u.channel = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("pitch", field)),
        }
    }
    Ok(u)
}

fn parse_mod(args: &[&str]) -> Result<ModWheelUpdate> {
    let mut u = ModWheelUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "channel" => u.channel = Some(parse_u8(field, value)?),
            "cc" => u.cc = Some(parse_u8(field, value)?),
            "min" => u.min = Some(parse_u8(field, value)?),
            "max" => u.max = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("mod", field)),
        }
    }
    Ok(u)
}

fn parse_sustain(args: &[&str]) -> Result<SustainUpdate> {
    let mut u = SustainUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "cc" => u.cc = Some(parse_u8(field, value)?),
            "min" => u.min = Some(parse_u8(field, value)?),
            "max" => u.max = Some(parse_u8(field, value)?),
            "channel" => u.channel = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("sustain", field)),
        }
    }
    Ok(u)
}

fn parse_knob(args: &[&str]) -> Result<KnobUpdate> {
    let mut u = KnobUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "mode" => u.mode = Some(parse_mode(value)?),
            "cc" => u.cc = Some(parse_u8(field, value)?),
            "min" => u.min = Some(parse_u8(field, value)?),
            "max" => u.max = Some(parse_u8(field, value)?),
            "channel" => u.channel = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("knob", field)),
        }
    }
    Ok(u)
}

fn parse_pad(args: &[&str]) -> Result<PadUpdate> {
    let mut u = PadUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "mode" => u.mode = Some(parse_mode(value)?),
            "note_or_cc" => u.note_or_cc = Some(parse_u8(field, value)?),
            "fixed_or_min" => u.fixed_or_min = Some(parse_u8(field, value)?),
            "velocity_or_max" => u.velocity_or_max = Some(parse_u8(field, value)?),
            "channel" => u.channel = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("pad", field)),
        }
    }
    Ok(u)
}

fn parse_button(args: &[&str]) -> Result<ButtonUpdate> {
    let mut u = ButtonUpdate::default();
    for (field, value) in assignments(args)? {
        match field {
            "mode" => u.mode = Some(parse_mode(value)?),
            "cc" => u.cc = Some(parse_u8(field, value)?),
            "on" => u.on = Some(parse_u8(field, value)?),
            "off" => u.off = Some(parse_u8(field, value)?),
            "channel" => u.channel = Some(parse_u8(field, value)?),
            _ => return Err(unknown_field("button", field)),
        }
    }
    Ok(u)
}

/// Parse one REPL line; blank lines give `None`
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match name.to_lowercase().as_str() {
        "show" => ReplCommand::Show,
        "query" => ReplCommand::Query,
        "send" => ReplCommand::Send,
        "log" => ReplCommand::Log,
        "clear" => ReplCommand::Clear,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        "keys" => ReplCommand::Edit(Edit::Keys(parse_keys(args)?)),
        "pitch" => ReplCommand::Edit(Edit::PitchWheel(parse_pitch(args)?)),
        "mod" => ReplCommand::Edit(Edit::ModWheel(parse_mod(args)?)),
        "sustain" => ReplCommand::Edit(Edit::Sustain(parse_sustain(args)?)),
        "knob" => {
            let index = control_index("knob", args)?;
            ReplCommand::Edit(Edit::Knob(index, parse_knob(&args[1..])?))
        }
        "pad" => {
            let index = control_index("pad", args)?;
            ReplCommand::Edit(Edit::Pad(index, parse_pad(&args[1..])?))
        }
        "button" => {
            let index = control_index("button", args)?;
            ReplCommand::Edit(Edit::Button(index, parse_button(&args[1..])?))
        }
        other => bail!("unknown command '{}', try 'help'", other),
    };
    Ok(Some(command))
}

/// Render the configuration as YAML
pub fn render_config(config: &Configuration) -> Result<String> {
    serde_yaml::to_string(config).context("Failed to serialize configuration")
}

/// Run a command against the session and produce the text to print
pub fn execute<S: MidiSink>(session: &mut EditorSession<S>, command: ReplCommand) -> Result<String> {
    debug!("REPL command: {:?}", command);
    match command {
        ReplCommand::Show => {
            let Some(config) = session.store().get() else {
                return Ok("No configuration yet, run 'query'".to_string());
            };
            let mut out = render_config(&config)?;
            if let Some(active) = session.activity().current() {
                out.push_str(&format!("active: {}\n", active));
            }
            if let Some(last) = session.log().last() {
                out.push_str(&format!("last: {}\n", last));
            }
            Ok(out)
        }
        ReplCommand::Query => {
            session.request_config()?;
            Ok("Query sent".to_string())
        }
        ReplCommand::Send => {
            session.push_config()?;
            Ok(format!("Configuration sent to {}", session.port_name()))
        }
        ReplCommand::Edit(edit) => {
            edit.apply(session.store())?;
            Ok(format!("{} updated", edit.describe()))
        }
        ReplCommand::Log => {
            if session.log().is_empty() {
                return Ok("Log is empty".to_string());
            }
            Ok(session
                .log()
                .entries()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ReplCommand::Clear => {
            session.log_mut().clear();
            Ok("Log cleared".to_string())
        }
        ReplCommand::Help => Ok(HELP.to_string()),
        ReplCommand::Quit => Ok(String::new()),
    }
}

/// Blocking line editor; returns when the user quits or input ends
pub fn run_repl(requests: mpsc::Sender<Request>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = rl.add_history_entry(line.as_str());

        let command = match parse_command(&line) {
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(ReplCommand::Help)) => {
                println!("{}", HELP);
                continue;
            }
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}", "error:".red(), e);
                continue;
            }
        };

        let (reply, response) = oneshot::channel();
        if requests.blocking_send(Request { command, reply }).is_err() {
            break;
        }
        match response.blocking_recv() {
            Ok(text) => println!("{}", text),
            Err(_) => break,
        }
    }

    Ok(())
}

/// Interactive editor: query the device, then serve REPL requests and
/// inbound MIDI until the user quits or presses Ctrl+C
pub async fn run_editor<S: MidiSink>(
    mut session: EditorSession<S>,
    mut inbound: mpsc::Receiver<Vec<u8>>,
) -> Result<()> {
    println!("{}", "=== V49 Editor ===".bold().cyan());
    println!("Type 'help' for commands\n");

    let (tx, mut requests) = mpsc::channel(16);
    let repl = std::thread::spawn(move || run_repl(tx));

    session.request_config()?;

    loop {
        tokio::select! {
            Some(data) = inbound.recv() => match session.handle_inbound(&data) {
                Ok(Inbound::Config(_)) => println!("{}", "Configuration received".green()),
                Ok(_) => {}
                Err(e) => warn!("Failed to handle inbound message: {}", e),
            },
            request = requests.recv() => {
                let Some(Request { command, reply }) = request else {
                    break;
                };
                let text = execute(&mut session, command)
                    .unwrap_or_else(|e| format!("{} {:#}", "error:".red(), e));
                let _ = reply.send(text);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Only joinable when the REPL ended on its own
    if repl.is_finished() {
        match repl.join() {
            Ok(result) => result?,
            Err(_) => warn!("REPL thread panicked"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::DEFAULT_HOLD;
    use crate::model::{ButtonMode, KnobMode, PadMode};
    use crate::transport::testing::RecordingSink;

    fn make_session() -> (EditorSession<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::default();
        (EditorSession::new(sink.clone(), DEFAULT_HOLD, 16), sink)
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("show").unwrap(), Some(ReplCommand::Show));
        assert_eq!(parse_command(" QUERY ").unwrap(), Some(ReplCommand::Query));
        assert_eq!(parse_command("exit").unwrap(), Some(ReplCommand::Quit));
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn test_parse_section_edits() {
        assert_eq!(
            parse_command("keys base_note=48 channel=2").unwrap(),
            Some(ReplCommand::Edit(Edit::Keys(KeysUpdate {
                base_note: Some(48),
                channel: Some(2),
                ..Default::default()
            })))
        );
        assert_eq!(
            parse_command("sustain cc=64").unwrap(),
            Some(ReplCommand::Edit(Edit::Sustain(SustainUpdate {
                cc: Some(64),
                ..Default::default()
            })))
        );
        assert!(parse_command("keys").is_err());
        assert!(parse_command("keys base_note").is_err());
        assert!(parse_command("pitch cc=1").is_err());
        assert!(parse_command("mod max=loud").is_err());
    }

    #[test]
    fn test_parse_indexed_edits() {
        assert_eq!(
            parse_command("knob 1 mode=aftertouch cc=20").unwrap(),
            Some(ReplCommand::Edit(Edit::Knob(
                0,
                KnobUpdate {
                    mode: Some(KnobMode::Aftertouch),
                    cc: Some(20),
                    ..Default::default()
                }
            )))
        );
        assert_eq!(
            parse_command("pad 8 mode=momentary_cc").unwrap(),
            Some(ReplCommand::Edit(Edit::Pad(
                7,
                PadUpdate {
                    mode: Some(PadMode::MomentaryCc),
                    ..Default::default()
                }
            )))
        );
        assert_eq!(
            parse_command("button 2 mode=momentary off=0").unwrap(),
            Some(ReplCommand::Edit(Edit::Button(
                1,
                ButtonUpdate {
                    mode: Some(ButtonMode::Momentary),
                    off: Some(0),
                    ..Default::default()
                }
            )))
        );
        assert!(parse_command("knob 0 cc=1").is_err());
        assert!(parse_command("knob cc=1").is_err());
        assert!(parse_command("knob 1").is_err());
        assert!(parse_command("pad 1 mode=loud").is_err());
    }

    #[test]
    fn test_edit_before_query_is_rejected() {
        let (mut session, _sink) = make_session();
        let command = parse_command("knob 1 cc=20").unwrap().unwrap();
        let err = execute(&mut session, command).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StateError>(),
            Some(&StateError::Uninitialized)
        );
    }

    #[test]
    fn test_edit_show_and_send() {
        let (mut session, sink) = make_session();
        session.store().set(Configuration::default()).unwrap();

        let out = execute(&mut session, parse_command("knob 2 cc=20").unwrap().unwrap()).unwrap();
        assert_eq!(out, "knob 2 updated");
        assert_eq!(session.store().get().unwrap().knobs[1].cc, 20);

        let out = execute(&mut session, ReplCommand::Show).unwrap();
        assert!(out.contains("cc: 20"));

        execute(&mut session, ReplCommand::Send).unwrap();
        assert_eq!(sink.sent.lock().len(), 1);
        assert_eq!(session.log().len(), 1);

        execute(&mut session, ReplCommand::Clear).unwrap();
        assert!(session.log().is_empty());
        assert_eq!(execute(&mut session, ReplCommand::Log).unwrap(), "Log is empty");
    }

    #[test]
    fn test_out_of_range_edits_are_rejected() {
        let (mut session, _sink) = make_session();
        session.store().set(Configuration::default()).unwrap();

        let err = execute(&mut session, parse_command("knob 5 cc=1").unwrap().unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StateError>(),
            Some(StateError::IndexOutOfRange { entity: "knob", index: 4, len: 4 })
        ));

        let err = execute(&mut session, parse_command("keys channel=16").unwrap().unwrap()).unwrap_err();
        assert!(matches!(err.downcast_ref::<StateError>(), Some(StateError::Invalid(_))));
        assert_eq!(session.store().get(), Some(Configuration::default()));
    }
}
