use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::future::TryFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use pin_project_lite::pin_project;
use tracing::{debug, debug_span, trace, Span};

use super::StagedMapper;
use crate::stage::Stage;

/// The default name given to a barrier's span.
pub const DEFAULT_STAGE_NAME: &str = "stage";

/// Runs a single stage over every element and waits for all of them.
pub struct Barrier<S> {
    stage: S,
    name: &'static str,
}

impl<S> Barrier<S> {
    pub fn new(stage: S) -> Self {
        Self::named(DEFAULT_STAGE_NAME, stage)
    }

    /// Creates a barrier whose log span carries the given name.
    pub fn named(name: &'static str, stage: S) -> Self {
        Self { stage, name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn into_inner(self) -> S {
        self.stage
    }
}

impl<S: Stage> StagedMapper for Barrier<S> {
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;
    type Future<'a> = StageBarrier<S::Future> where Self: 'a;

    fn map_all(&self, inputs: Vec<Self::Input>) -> Self::Future<'_> {
        let span = debug_span!("stage", stage = self.name, width = inputs.len());
        StageBarrier::launch(span, inputs.into_iter().map(|input| self.stage.apply(input)))
    }
}

pin_project! {
    /// Tags an element future with its position in the working sequence.
    struct Indexed<Fut> {
        index: usize,
        #[pin]
        inner: Fut,
    }
}

impl<Fut: TryFuture> Future for Indexed<Fut> {
    type Output = (usize, Result<Fut::Ok, Fut::Error>);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.project();
        let result = ready!(me.inner.try_poll(cx));
        Poll::Ready((*me.index, result))
    }
}

pin_project! {
    /// Joins the futures of every element of one stage.
    ///
    /// Resolves to the outputs in input order, or to the first error to settle. Elements are
    /// polled as a set, so a failure never waits behind a slower element at a lower index. Once
    /// an error settles the remaining element futures are dropped.
    pub struct StageBarrier<Fut>
    where
        Fut: TryFuture,
    {
        in_flight: FuturesUnordered<Indexed<Fut>>,
        outputs: Vec<Option<Fut::Ok>>,
        done: bool,
        span: Span,
    }
}

impl<Fut: TryFuture> StageBarrier<Fut> {
    /// Launches every future at once. Nothing is awaited until the barrier is polled.
    pub(crate) fn launch<I>(span: Span, futures: I) -> Self
    where
        I: IntoIterator<Item = Fut>,
    {
        let in_flight: FuturesUnordered<_> = span.in_scope(|| {
            trace!("launching stage");
            futures
                .into_iter()
                .enumerate()
                .map(|(index, inner)| Indexed { index, inner })
                .collect()
        });
        let outputs = (0..in_flight.len()).map(|_| None).collect();
        Self {
            in_flight,
            outputs,
            done: false,
            span,
        }
    }
}

impl<Fut: TryFuture> Future for StageBarrier<Fut> {
    type Output = Result<Vec<Fut::Ok>, Fut::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.project();
        if *me.done {
            panic!("`StageBarrier` polled after completion");
        }
        let _enter = me.span.enter();

        while let Some((index, result)) = ready!(me.in_flight.poll_next_unpin(cx)) {
            match result {
                Ok(output) => me.outputs[index] = Some(output),
                Err(error) => {
                    debug!(index, "stage failed, abandoning in-flight elements");
                    *me.done = true;
                    me.in_flight.clear();
                    return Poll::Ready(Err(error));
                }
            }
        }

        debug!(settled = me.outputs.len(), "stage settled");
        *me.done = true;
        Poll::Ready(Ok(me.outputs.drain(..).flatten().collect()))
    }
}
