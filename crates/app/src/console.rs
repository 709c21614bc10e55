use crate::catalog::Catalog;
use anyhow::{bail, Context, Result};
use jukebox_core::urls::track_url;
use jukebox_core::{format_duration, parse_time_point, PlaybackState, RoomConfig, TrackRecord};
use jukebox_engine::{Controller, DeletionResult, StartOutcome};
use jukebox_transport::{apply_remote, RemoteAction, RemoteEvent, RemoteOutcome};
use std::time::{Duration, SystemTime};

pub const HELP: &str = "\
commands:
  play <query>            start a catalog track, or queue it behind the active one
  playlist <q1>, <q2>, .. queue several tracks; the first starts if nothing is active
  skip | replay           next track / restart the current one
  pause | resume [time]   freeze playback / continue, optionally from a time point
  seek <time>             jump within the current track
  stop | clear            stop playback / stop and empty the playlist
  del <i,j,..>|<lo:hi>    delete playlist positions or an inclusive range
  queue | next            playlist from the current track / the track after it
  now | who | info        what is playing, who asked for it, where it comes from
  status                  playback state and playlist size
  remote <nick> play <time> <query> | remote <nick> pause <time>
                          apply a play/pause seen from another participant
time points: 90, 4m, 1m30s, 1h2m3s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Playlist(Vec<String>),
    Skip,
    Replay,
    Pause,
    Resume(Option<Duration>),
    Seek(Duration),
    Stop,
    Delete { indices: Vec<usize>, by_range: bool },
    Clear,
    Queue,
    Next,
    Now,
    Who,
    Info,
    Status,
    Help,
    RemotePlay { origin: String, offset: Duration, query: String },
    RemotePause { origin: String, offset: Duration },
}

/// What a console command needs besides the controller. Replaced wholesale on
/// config reload.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub catalog: Catalog,
    pub room: RoomConfig,
}

fn time_arg(arg: &str) -> Result<Duration> {
    parse_time_point(arg)
        .map(Duration::from_secs)
        .with_context(|| format!("invalid time point {arg:?}"))
}

fn delete_args(arg: &str) -> Result<(Vec<usize>, bool)> {
    let (parts, by_range): (Vec<&str>, bool) = match arg.split_once(':') {
        Some((lo, hi)) => (vec![lo, hi], true),
        None => (arg.split(',').collect(), false),
    };
    let indices = parts
        .into_iter()
        .map(|p| {
            p.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid playlist index {:?}", p.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((indices, by_range))
}

/// Parses one console line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match (word.to_lowercase().as_str(), rest) {
        ("play", "") => bail!("usage: play <query>"),
        ("play", query) => Command::Play(query.to_string()),
        ("playlist", "") => bail!("usage: playlist <query>, <query>, .."),
        ("playlist", list) => Command::Playlist(
            list.split(',')
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        ("skip", _) => Command::Skip,
        ("replay", _) => Command::Replay,
        ("pause", _) => Command::Pause,
        ("resume", "") => Command::Resume(None),
        ("resume", time) => Command::Resume(Some(time_arg(time)?)),
        ("seek", "") => bail!("usage: seek <time>"),
        ("seek", time) => Command::Seek(time_arg(time)?),
        ("stop", _) => Command::Stop,
        ("del", "") => bail!("usage: del <i,j,..> or del <lo:hi>"),
        ("del", arg) => {
            let (indices, by_range) = delete_args(arg)?;
            Command::Delete { indices, by_range }
        }
        ("clear", _) => Command::Clear,
        ("queue", _) => Command::Queue,
        ("next", _) => Command::Next,
        ("now", _) => Command::Now,
        ("who", _) => Command::Who,
        ("info", _) => Command::Info,
        ("status", _) => Command::Status,
        ("help", _) => Command::Help,
        ("remote", args) => parse_remote(args)?,
        (other, _) => bail!("unknown command {other:?}, try `help`"),
    };
    Ok(Some(cmd))
}

fn parse_remote(args: &str) -> Result<Command> {
    let mut parts = args.splitn(4, char::is_whitespace).filter(|p| !p.is_empty());
    let (Some(origin), Some(action), Some(time)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("usage: remote <nick> play <time> <query> | remote <nick> pause <time>");
    };
    let origin = origin.to_string();
    let offset = time_arg(time)?;
    match (action, parts.next()) {
        ("play", Some(query)) => Ok(Command::RemotePlay {
            origin,
            offset,
            query: query.trim().to_string(),
        }),
        ("pause", None) => Ok(Command::RemotePause { origin, offset }),
        _ => bail!("usage: remote <nick> play <time> <query> | remote <nick> pause <time>"),
    }
}

fn describe(track: &TrackRecord) -> String {
    format!("{} ({})", track.title, format_duration(track.duration_secs))
}

fn state_word(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
        PlaybackState::Stopped => "Stopped",
    }
}

fn describe_deletion(result: &DeletionResult) -> String {
    if let Some(title) = &result.track_title {
        return format!("Deleted {title}");
    }
    match result.range {
        Some((lo, hi)) => format!("Deleted {} tracks from {lo} to {hi}", result.count()),
        None => {
            let list: Vec<String> = result.deleted.iter().map(usize::to_string).collect();
            format!("Deleted tracks at indexes: {}", list.join(", "))
        }
    }
}

fn resolve(session: &Session, query: &str, requester: &str) -> Result<TrackRecord, String> {
    let candidate = session
        .catalog
        .resolve(query)
        .cloned()
        .ok_or_else(|| format!("Could not find anything matching {query:?}."))?;
    TrackRecord::resolve(candidate, requester, SystemTime::now()).map_err(|e| e.to_string())
}

/// Runs `cmd` against the room and returns the reply for the console. Blocks
/// on the room lock, so call it off the async executor.
pub fn execute(controller: &Controller, session: &Session, cmd: Command) -> String {
    match cmd {
        Command::Play(query) => {
            let track = match resolve(session, &query, &session.room.console_requester) {
                Ok(track) => track,
                Err(reply) => return reply,
            };
            let summary = describe(&track);
            match controller.start(track) {
                StartOutcome::Started { .. } => format!("Now playing: {summary}"),
                StartOutcome::Enqueued { index } => {
                    format!("Added ({index}) {summary} to the playlist.")
                }
            }
        }
        Command::Playlist(queries) => {
            let requester = &session.room.console_requester;
            let (tracks, missing): (Vec<_>, Vec<_>) = queries
                .iter()
                .map(|q| resolve(session, q, requester))
                .partition(Result::is_ok);
            let tracks: Vec<TrackRecord> = tracks.into_iter().filter_map(Result::ok).collect();
            let count = tracks.len();
            let mut reply = match controller.enqueue_all(tracks) {
                Ok(StartOutcome::Started { index }) => {
                    format!("Added {count} tracks, playing from ({index}).")
                }
                Ok(StartOutcome::Enqueued { index }) => {
                    format!("Added {count} tracks from ({index}).")
                }
                Err(err) => err.to_string(),
            };
            if !missing.is_empty() {
                reply.push_str(&format!(" {} not found.", missing.len()));
            }
            reply
        }
        Command::Skip => match controller.skip() {
            Ok(track) => format!("Skipped to {}", describe(&track)),
            Err(err) => err.to_string(),
        },
        Command::Replay => match controller.replay() {
            Ok(track) => format!("Replaying {}", describe(&track)),
            Err(err) => err.to_string(),
        },
        Command::Pause => match controller.pause() {
            Ok(at) => format!("Paused at {}", format_duration(at.as_secs())),
            Err(err) => err.to_string(),
        },
        Command::Resume(offset) => match controller.resume(offset) {
            Ok(at) => format!("Resumed at {}", format_duration(at.as_secs())),
            Err(err) => err.to_string(),
        },
        Command::Seek(offset) => match controller.seek(offset) {
            Ok(state) => format!(
                "{} from {}",
                state_word(state),
                format_duration(offset.as_secs())
            ),
            Err(err) => err.to_string(),
        },
        Command::Stop => match controller.stop() {
            Ok(track) => format!("Stopped {}", track.title),
            Err(err) => err.to_string(),
        },
        Command::Delete { indices, by_range } => {
            match controller.delete_items(&indices, by_range) {
                Ok(result) => describe_deletion(&result),
                Err(err) => err.to_string(),
            }
        }
        Command::Clear => match controller.clear() {
            Ok(count) => format!("Deleted {count} items in the playlist."),
            Err(err) => err.to_string(),
        },
        Command::Queue => {
            let tracks = controller.queue_snapshot();
            if tracks.is_empty() {
                return "The playlist is empty.".to_string();
            }
            let current = controller.current_track().map(|(i, _)| i);
            tracks
                .iter()
                .map(|(i, t)| {
                    let mark = if Some(*i) == current { '*' } else { ' ' };
                    format!("{mark}({i}) {}", describe(t))
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Next => match controller.next_track() {
            Ok((index, track)) => format!("Next track: ({index}) {}", describe(&track)),
            Err(err) => err.to_string(),
        },
        Command::Now => {
            let snap = controller.snapshot();
            match (&snap.current, snap.state) {
                (Some((_, track)), state) if state != PlaybackState::Stopped => format!(
                    "{}: {} {}/{}, {} left",
                    state_word(state),
                    track.title,
                    format_duration(snap.elapsed.as_secs()),
                    format_duration(track.duration_secs),
                    format_duration(snap.remaining.as_secs()),
                ),
                _ => "No track is playing.".to_string(),
            }
        }
        Command::Who => match controller.current_track() {
            Some((_, track)) => format!(
                "{} was requested by {} {} ago.",
                track.title,
                track.requester,
                format_duration(track.requested_ago(SystemTime::now()).as_secs())
            ),
            None => "No track is loaded.".to_string(),
        },
        Command::Info => match controller.current_track() {
            Some((index, track)) => format!(
                "({index}) {}\n{} {}\nrequested by {}",
                describe(&track),
                track.source.label(),
                track_url(track.source, &track.id),
                track.requester
            ),
            None => "No track is loaded.".to_string(),
        },
        Command::Status => {
            let snap = controller.snapshot();
            format!(
                "{}, {} track(s) in the playlist, {} upcoming.",
                state_word(snap.state),
                snap.queue_len,
                snap.upcoming
            )
        }
        Command::Help => HELP.to_string(),
        Command::RemotePlay {
            origin,
            offset,
            query,
        } => {
            let track = match resolve(session, &query, &origin) {
                Ok(track) => track,
                Err(reply) => return reply,
            };
            remote_reply(controller, session, RemoteEvent {
                origin,
                action: RemoteAction::Play { track, offset },
            })
        }
        Command::RemotePause { origin, offset } => remote_reply(
            controller,
            session,
            RemoteEvent {
                origin,
                action: RemoteAction::Pause { offset },
            },
        ),
    }
}

fn remote_reply(controller: &Controller, session: &Session, event: RemoteEvent) -> String {
    match apply_remote(controller, &session.room.bot_name, event) {
        Ok(RemoteOutcome::Ignored) => "Ignored.".to_string(),
        Ok(RemoteOutcome::Applied(state)) => format!("Synced: {}", state_word(state)),
        Err(err) => err.to_string(),
    }
}
