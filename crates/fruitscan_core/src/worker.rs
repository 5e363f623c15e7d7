//! Runs a classification job on a background thread.
//!
//! The [`Session`] stays on the control thread; only the [`ClassifyJob`]
//! moves to the worker, which streams [`Progress`] checkpoints back over a
//! channel. The session's `Classifying` state doubles as the in-flight guard.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::error::{ClassificationError, ClassifyError};
use crate::interpret::ClassificationResult;
use crate::session::{ClassifyJob, Progress, Session};

enum WorkerEvent {
    Progress(Progress),
    Finished(Result<ClassificationResult, ClassificationError>),
}

/// Result of polling a running task.
#[derive(Debug)]
pub enum TaskPoll {
    /// Still running: the task comes back with the newest checkpoint seen
    /// since the last poll.
    Pending(ClassifyTask, Option<Progress>),
    /// The outcome has been recorded in the session; the task is spent.
    Done(Result<ClassificationResult, ClassificationError>),
}

#[derive(Debug)]
pub struct ClassifyTask {
    events: Receiver<WorkerEvent>,
}

impl ClassifyTask {
    /// Start classifying the session's working image on a new thread.
    pub fn spawn(session: &mut Session) -> Result<Self, ClassifyError> {
        let job = session.begin_classify()?;
        let events = spawn_worker(job)
            .map_err(|e| ClassifyError::Failed(session.fail(ClassificationError::Spawn(e))))?;
        Ok(Self { events })
    }

    /// Drain pending events without blocking.
    pub fn poll(self, session: &mut Session) -> TaskPoll {
        let mut latest = None;
        loop {
            match self.events.try_recv() {
                Ok(WorkerEvent::Progress(p)) => latest = Some(p),
                Ok(WorkerEvent::Finished(outcome)) => {
                    return TaskPoll::Done(session.finish_classify(outcome));
                }
                Err(TryRecvError::Empty) => return TaskPoll::Pending(self, latest),
                Err(TryRecvError::Disconnected) => {
                    return TaskPoll::Done(
                        session.finish_classify(Err(ClassificationError::WorkerLost)),
                    );
                }
            }
        }
    }

    /// Block until the worker finishes, forwarding checkpoints to `progress`.
    pub fn wait<F>(
        self,
        session: &mut Session,
        mut progress: F,
    ) -> Result<ClassificationResult, ClassificationError>
    where
        F: FnMut(Progress),
    {
        loop {
            match self.events.recv() {
                Ok(WorkerEvent::Progress(p)) => progress(p),
                Ok(WorkerEvent::Finished(outcome)) => {
                    let result = session.finish_classify(outcome)?;
                    progress(Progress::Done);
                    return Ok(result);
                }
                Err(_) => return session.finish_classify(Err(ClassificationError::WorkerLost)),
            }
        }
    }
}

fn spawn_worker(job: ClassifyJob) -> std::io::Result<Receiver<WorkerEvent>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("classify".into())
        .spawn(move || {
            let progress_tx = tx.clone();
            let outcome = job.run(|p| {
                // The receiver may be gone if the UI closed; nothing to do then.
                let _ = progress_tx.send(WorkerEvent::Progress(p));
            });
            let _ = tx.send(WorkerEvent::Finished(outcome));
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::session::tests::{FixedScores, session_with, write_image};
    use anyhow::Result;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[test]
    fn worker_streams_checkpoints_and_records_result() -> Result<()> {
        let dir = tempdir()?;
        let mut session = session_with(FixedScores(vec![0.0, 4.0, 1.0]), &["A", "B", "C"]);
        session.load_image(write_image(&dir, "fruit.png")?)?;

        let task = ClassifyTask::spawn(&mut session)?;
        assert_eq!(session.state(), SessionState::Classifying);
        assert!(matches!(
            ClassifyTask::spawn(&mut session),
            Err(ClassifyError::InFlight)
        ));

        let mut seen = Vec::new();
        let result = task.wait(&mut session, |p| seen.push(p.percent()))?;
        assert_eq!(seen, vec![0, 30, 60, 100]);
        assert_eq!(result.label, "B");
        assert_eq!(session.state(), SessionState::ResultReady);
        assert_eq!(session.history().len(), 1);
        Ok(())
    }

    #[test]
    fn poll_eventually_completes() -> Result<()> {
        let dir = tempdir()?;
        let mut session = session_with(FixedScores(vec![1.0]), &["Only"]);
        session.load_image(write_image(&dir, "fruit.png")?)?;
        let task = ClassifyTask::spawn(&mut session)?;
        let outcome = poll_to_completion(task, &mut session);
        assert_eq!(outcome?.label, "Only");
        assert_eq!(session.state(), SessionState::ResultReady);
        Ok(())
    }

    fn poll_to_completion(
        mut task: ClassifyTask,
        session: &mut Session,
    ) -> Result<ClassificationResult, ClassificationError> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match task.poll(session) {
                TaskPoll::Done(outcome) => return outcome,
                TaskPoll::Pending(next, _) => {
                    assert!(Instant::now() < deadline, "worker did not finish");
                    std::thread::sleep(Duration::from_millis(5));
                    task = next;
                }
            }
        }
    }

    #[test]
    fn finished_worker_cannot_fail_the_session_afterwards() -> Result<()> {
        let dir = tempdir()?;
        let mut session = session_with(FixedScores(vec![0.0, 2.0]), &["A", "B"]);
        session.load_image(write_image(&dir, "fruit.png")?)?;

        let task = ClassifyTask::spawn(&mut session)?;
        assert_eq!(poll_to_completion(task, &mut session)?.label, "B");
        assert_eq!(session.state(), SessionState::ResultReady);

        // The worker's channel is closed now; a late "worker lost" report
        // must not overwrite the recorded result.
        assert!(matches!(
            session.finish_classify(Err(ClassificationError::WorkerLost)),
            Err(ClassificationError::NotInFlight(SessionState::ResultReady))
        ));
        assert_eq!(session.state(), SessionState::ResultReady);
        assert_eq!(session.history().len(), 1);

        let task = ClassifyTask::spawn(&mut session)?;
        poll_to_completion(task, &mut session)?;
        assert_eq!(session.history().len(), 2);
        Ok(())
    }

    #[test]
    fn spawn_without_image_is_rejected() {
        let mut session = session_with(FixedScores(vec![1.0]), &["Only"]);
        assert!(matches!(
            ClassifyTask::spawn(&mut session),
            Err(ClassifyError::NotReady(SessionState::Idle))
        ));
    }
}
