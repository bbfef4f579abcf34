use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use yarn_core::{assemble_scene, RecordingSink, RibWriter, SceneConfig, SceneStats, Session};

/// Frame name used when the stream goes straight to a renderer.
const RENDER_TARGET: &str = "__render";

/// Where the assembled scene goes.
#[derive(Debug)]
pub(crate) enum Destination<'a> {
    /// RIB archive on disk, or stdout for `-`.
    Archive(&'a Path),
    /// Renderer command that reads RIB from stdin.
    Renderer(&'a str),
    /// Assemble into memory only.
    DryRun,
}

pub(crate) fn run(config: &SceneConfig, destination: Destination<'_>) -> anyhow::Result<SceneStats> {
    match destination {
        Destination::Archive(path) if path == Path::new("-") => {
            let stdout = io::stdout().lock();
            write_rib(config, BufWriter::new(stdout), "stdout")
        }
        Destination::Archive(path) => {
            let file =
                File::create(path).with_context(|| format!("failed to create {path:?}"))?;
            let stats = write_rib(config, BufWriter::new(file), &path.to_string_lossy())?;
            tracing::info!("wrote RIB archive {:?}", path);
            Ok(stats)
        }
        Destination::Renderer(command) => render(config, command),
        Destination::DryRun => dry_run(config),
    }
}

fn write_rib<W: Write>(config: &SceneConfig, out: W, target: &str) -> anyhow::Result<SceneStats> {
    let mut session = Session::new(RibWriter::new(out));
    let stats = assemble_scene(&mut session, config, target).context("failed to assemble scene")?;
    session
        .into_inner()
        .finish()
        .context("failed to finish RIB stream")?;
    Ok(stats)
}

fn render(config: &SceneConfig, command: &str) -> anyhow::Result<SceneStats> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("renderer command is empty");
    };
    tracing::info!(renderer = program, "starting renderer");
    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start renderer {program:?}"))?;

    let stats = {
        let stdin = child
            .stdin
            .take()
            .context("renderer stdin was not captured")?;
        write_rib(config, BufWriter::new(stdin), RENDER_TARGET)
    };
    // stdin is closed at this point, so the renderer sees end of stream.
    let status = child.wait().context("failed to wait for renderer")?;
    let stats = stats?;
    if !status.success() {
        bail!("renderer {program:?} exited with {status}");
    }
    Ok(stats)
}

fn dry_run(config: &SceneConfig) -> anyhow::Result<SceneStats> {
    let mut session = Session::new(RecordingSink::new());
    let stats = assemble_scene(&mut session, config, RENDER_TARGET)
        .context("failed to assemble scene")?;
    let sink = session.into_inner();
    tracing::info!(
        requests = sink.requests().len(),
        curves = sink.count("Curves"),
        "dry run complete"
    );
    Ok(stats)
}
