use anyhow::{Context, Result, anyhow};
use log::info;
use pico_args::Arguments;
use std::{
    env,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::config::{ConfigState, Profile};
use crate::frame::Frame;
use crate::motion;
use crate::session::{ControlFlags, RunOptions, Session};
use crate::source::{FrameSource, ImageSequenceSource, RawStreamSource};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("run") => cmd_run(&mut pargs),

        Some("motion") => {
            let profile = resolve_profile(&mut pargs)?;
            let a: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: chappathi motion <prev_image> <curr_image>"))?;
            let b: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: chappathi motion <prev_image> <curr_image>"))?;
            let prev = load_frame(&a)?;
            let curr = load_frame(&b)?;
            let sample = motion::compute(&prev, &curr, &profile.motion)?;
            print_response(&serde_json::json!({"ok": true, "data": sample}));
            Ok(())
        }

        Some("list") => {
            let st = ConfigState::load_or_install_default()?;
            print_response(&serde_json::json!({
                "ok": true,
                "data": {"profiles": st.list_profiles(), "active": st.active_name}
            }));
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: chappathi use <profile_name>"))?;
            let mut st = ConfigState::load_or_install_default()?;
            st.set_active(&name)?;
            print_response(&serde_json::json!({"ok": true, "data": {"active_profile": st.active_name}}));
            Ok(())
        }

        Some("show") => {
            let st = ConfigState::load_or_install_default()?;
            print_response(&serde_json::json!({"ok": true, "data": st.report()}));
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn cmd_run(pargs: &mut Arguments) -> Result<()> {
    let profile = resolve_profile(pargs)?;
    let frames_dir: Option<PathBuf> = pargs.opt_value_from_str("--frames")?;
    let raw_geometry: Option<String> = pargs.opt_value_from_str("--raw")?;
    let out_path: Option<PathBuf> = pargs.opt_value_from_str("--out")?;
    let opts = RunOptions {
        max_ticks: pargs.opt_value_from_str("--max-ticks")?,
        fps: pargs.opt_value_from_str("--fps")?,
        status_every: pargs.opt_value_from_str("--status-every")?.unwrap_or(30),
    };

    let mut source: Box<dyn FrameSource> = match (frames_dir, raw_geometry) {
        (Some(dir), None) => Box::new(ImageSequenceSource::open(&dir)?),
        (None, Some(geom)) => {
            let (w, h) = parse_geometry(&geom)?;
            Box::new(RawStreamSource::new("stdin", io::stdin().lock(), w, h)?)
        }
        _ => {
            return Err(anyhow!(
                "usage: chappathi run (--frames <dir> | --raw <WIDTHxHEIGHT>) [options]"
            ));
        }
    };

    let mut out: Box<dyn Write> = match out_path {
        Some(p) => Box::new(BufWriter::new(
            File::create(&p).with_context(|| format!("cannot create {}", p.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let ctl = ControlFlags::register()?;
    info!(
        "Welcome to the Virtual Chappathi Maker! (profile '{}')",
        profile.meta.name.as_deref().unwrap_or("unnamed")
    );
    Session::new(profile).run(source.as_mut(), out.as_mut(), &opts, &ctl)?;
    Ok(())
}

/// `--profile <file>` wins over the active profile pointer.
fn resolve_profile(pargs: &mut Arguments) -> Result<Profile> {
    let explicit: Option<PathBuf> = pargs.opt_value_from_str("--profile")?;
    match explicit {
        Some(p) => Profile::load_file(&p),
        None => Ok(ConfigState::load_or_install_default()?.profile),
    }
}

fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(Frame::from_dynamic(img)?)
}

fn parse_geometry(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("geometry must look like 640x480, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|_| anyhow!("bad width in '{s}'"))?;
    let h: u32 = h.trim().parse().map_err(|_| anyhow!("bad height in '{s}'"))?;
    if w == 0 || h == 0 {
        return Err(anyhow!("geometry must be non-zero, got '{s}'"));
    }
    Ok((w, h))
}

fn print_help() {
    println!(
        r#"chappathi — motion-driven virtual chappathi maker

USAGE:
  chappathi help [command]                  Show general or command-specific help
  chappathi run --frames <dir> [options]    Play an image sequence (loops forever)
  chappathi run --raw <WxH> [options]       Read raw 8-bit gray frames from stdin
  chappathi motion <prev> <curr>            Motion magnitude between two images
  chappathi list                            List profiles
  chappathi use <name>                      Switch active profile
  chappathi show                            Show config paths and active profile

RUN OPTIONS:
  --profile <file>      Use this profile instead of the active one
  --out <file>          Write render descriptors here instead of stdout
  --fps <n>             Pace playback to n ticks per second
  --max-ticks <n>       Stop after n ticks
  --status-every <n>    Log a status line every n ticks (default 30, 0 = off)

SIGNALS:
  SIGINT/SIGTERM end the session, SIGUSR1 starts over with fresh dough.

TIPS:
  - Profiles: ~/.config/chappathi/profiles
  - Active profile pointer: ~/.config/chappathi/active
  - Webcam: ffmpeg -f v4l2 -i /dev/video0 -vf hflip -pix_fmt gray -s 640x480 -f rawvideo - | chappathi run --raw 640x480
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: chappathi run (--frames <dir> | --raw <WxH>) [--profile <file>] [--out <file>] [--fps <n>] [--max-ticks <n>] [--status-every <n>]\nDrives the dough through kneading, rolling and cooking; emits one JSON render descriptor per frame."
        ),
        "motion" => println!(
            "usage: chappathi motion [--profile <file>] <prev> <curr>\nPrints the motion magnitude between two frames."
        ),
        "list" => println!("usage: chappathi list\nLists available profiles."),
        "use" => {
            println!("usage: chappathi use <name>\nSwitches the active profile to <name>.")
        }
        "show" => println!("usage: chappathi show\nShows config paths and the active profile values."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_parsing() {
        assert_eq!(parse_geometry("640x480").unwrap(), (640, 480));
        assert_eq!(parse_geometry("320X240").unwrap(), (320, 240));
        assert!(parse_geometry("640").is_err());
        assert!(parse_geometry("0x480").is_err());
        assert!(parse_geometry("ax480").is_err());
    }
}
