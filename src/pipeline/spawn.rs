use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::task::JoinSet;
use tracing::{debug, debug_span, trace, Span};

use super::barrier::DEFAULT_STAGE_NAME;
use super::StagedMapper;
use crate::stage::Stage;

/// Runs a single stage with every element on its own Tokio task.
///
/// Behaves like a `Barrier`, except that elements may run in parallel on a multi-threaded
/// runtime. The tasks are spawned on the first poll, which must happen inside a Tokio runtime.
pub struct Spawned<S> {
    stage: Arc<S>,
    name: &'static str,
}

impl<S> Spawned<S> {
    pub fn new(stage: S) -> Self {
        Self::named(DEFAULT_STAGE_NAME, stage)
    }

    pub fn named(name: &'static str, stage: S) -> Self {
        Self::from_shared(name, Arc::new(stage))
    }

    /// Creates a spawned barrier from a stage which is already shared elsewhere.
    pub fn from_shared(name: &'static str, stage: Arc<S>) -> Self {
        Self { stage, name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<S> StagedMapper for Spawned<S>
where
    S: Stage + Send + Sync + 'static,
    S::Input: Send + 'static,
    S::Output: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;
    type Future<'a> = SpawnBarrier<S> where Self: 'a;

    fn map_all(&self, inputs: Vec<Self::Input>) -> Self::Future<'_> {
        let span = debug_span!("stage", stage = self.name, width = inputs.len());
        SpawnBarrier {
            stage: Arc::clone(&self.stage),
            pending: Some(inputs),
            tasks: JoinSet::new(),
            results: Vec::new(),
            done: false,
            span,
        }
    }
}

/// Future returned by `Spawned::map_all`.
///
/// Dropping it aborts every task which has not finished yet.
pub struct SpawnBarrier<S: Stage> {
    stage: Arc<S>,
    pending: Option<Vec<S::Input>>,
    tasks: JoinSet<(usize, Result<S::Output, S::Error>)>,
    results: Vec<Option<S::Output>>,
    done: bool,
    span: Span,
}

// no field is ever pinned
impl<S: Stage> Unpin for SpawnBarrier<S> {}

impl<S> Future for SpawnBarrier<S>
where
    S: Stage + Send + Sync + 'static,
    S::Input: Send + 'static,
    S::Output: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Output = Result<Vec<S::Output>, S::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();
        if me.done {
            panic!("`SpawnBarrier` polled after completion");
        }
        let _enter = me.span.enter();

        if let Some(inputs) = me.pending.take() {
            trace!("spawning stage tasks");
            me.results = inputs.iter().map(|_| None).collect();
            for (index, input) in inputs.into_iter().enumerate() {
                let stage = Arc::clone(&me.stage);
                me.tasks.spawn(async move { (index, stage.apply(input).await) });
            }
        }

        while let Some(joined) = ready!(me.tasks.poll_join_next(cx)) {
            match joined {
                Ok((index, Ok(output))) => me.results[index] = Some(output),
                Ok((_, Err(error))) => {
                    debug!("stage failed, aborting in-flight elements");
                    me.done = true;
                    me.tasks.abort_all();
                    return Poll::Ready(Err(error));
                }
                Err(join_error) if join_error.is_panic() => {
                    me.tasks.abort_all();
                    std::panic::resume_unwind(join_error.into_panic());
                }
                Err(join_error) => panic!("stage task did not run to completion: {join_error}"),
            }
        }

        debug!(settled = me.results.len(), "stage settled");
        me.done = true;
        Poll::Ready(Ok(me.results.drain(..).flatten().collect()))
    }
}
