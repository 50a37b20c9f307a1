//! Connection handler
//!
//! Drives one session from accept to close: sets up line framing, spawns
//! the writer task, runs the read loop that dispatches one
//! [`CommandTask`] per line, then drains.
//!
//! A failed write ends the read loop the same way a failed read does.
//! Draining waits for every outstanding task, leaves every board the
//! session is still on, waits for those leaves, and only then closes the
//! outbound path. Nothing is sent on a closed connection.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::CommandTask;
use crate::error::AppError;
use crate::protocol::{Command, Reply};
use crate::registry::BoardRegistry;
use crate::session::{Session, SessionState};

/// Handle a new connection
///
/// Returns once the session is closed and every task it spawned has
/// finished. A read or write error still drains the session before it
/// is returned.
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    registry: Arc<BoardRegistry>,
    max_line_length: usize,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length));
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    // Create channel for server -> client lines
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Reply>();
    let session = Arc::new(Session::new(peer, msg_tx));
    info!("Session {} connected from {}", session.id, session.peer);

    // Spawn write task (Reply -> stream); the only writer for this connection
    let session_id = session.id;
    let write_failed = CancellationToken::new();
    let writer_failed = write_failed.clone();
    let write_task = tokio::spawn(async move {
        while let Some(reply) = msg_rx.recv().await {
            let line = reply.to_string();
            debug!("{} < {}", session_id, line);
            if let Err(e) = sink.send(line).await {
                debug!("Write failed for {}: {}", session_id, e);
                writer_failed.cancel();
                break;
            }
        }
        // Flush and shut down the write half
        if let Err(e) = SinkExt::<String>::close(&mut sink).await {
            debug!("Closing write half for {} failed: {}", session_id, e);
        }
        debug!("Write task ended for {}", session_id);
    });

    session.set_state(SessionState::Active);
    let mut tasks = JoinSet::new();
    let result = read_loop(&mut lines, &session, &registry, &mut tasks, &write_failed).await;
    if let Err(e) = &result {
        warn!("Connection error for {}: {}", session.id, e);
    }

    session.set_state(SessionState::Draining);
    drain(&session, &registry, &mut tasks).await;

    session.close();
    if let Err(e) = write_task.await {
        warn!("Write task for {} failed: {}", session.id, e);
    }

    info!("Session {} disconnected", session.id);
    result
}

/// Dispatch lines until end of stream, EXIT, or a read or write error
async fn read_loop<R>(
    lines: &mut FramedRead<R, LinesCodec>,
    session: &Arc<Session>,
    registry: &Arc<BoardRegistry>,
    tasks: &mut JoinSet<()>,
    write_failed: &CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = tokio::select! {
            _ = write_failed.cancelled() => {
                debug!("Session {} lost its writer", session.id);
                return Err(AppError::WriteFailed);
            }
            line = lines.next() => match line {
                Some(line) => line?,
                None => break,
            },
        };
        debug!("{} ? {}", session.id, line);
        reap_finished(session, tasks);

        let Some(task) = CommandTask::from_line(&line, Arc::clone(session), Arc::clone(registry))
        else {
            continue;
        };
        if matches!(task.command(), Command::Exit) {
            debug!("Session {} sent EXIT", session.id);
            break;
        }
        tasks.spawn(task.run());
    }
    Ok(())
}

/// Wait out in-flight work, then leave every joined board
async fn drain(session: &Arc<Session>, registry: &Arc<BoardRegistry>, tasks: &mut JoinSet<()>) {
    wait_all(session, tasks).await;

    for group in session.joined_boards().await {
        let task = CommandTask::leave(group, Arc::clone(session), Arc::clone(registry));
        tasks.spawn(task.run());
    }
    wait_all(session, tasks).await;
}

async fn wait_all(session: &Session, tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            warn!("Command task for {} failed: {}", session.id, e);
        }
    }
}

fn reap_finished(session: &Session, tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            warn!("Command task for {} failed: {}", session.id, e);
        }
    }
}
