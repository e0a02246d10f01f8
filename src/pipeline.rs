use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::future::{self, Ready};
use pin_project_lite::pin_project;
use tracing::debug_span;

use crate::stage::Stage;

/// A single stage fanned out over every element, then joined.
pub mod barrier;
/// Typed composition of mappers.
pub mod link;
/// A barrier which spawns every element onto the Tokio runtime.
#[cfg(feature = "spawn")]
pub mod spawn;

pub use barrier::{Barrier, StageBarrier};
pub use link::{link, Link, LinkFuture};
#[cfg(feature = "spawn")]
pub use spawn::{SpawnBarrier, Spawned};

/// Maps a whole working sequence through one or more stages.
///
/// Every stage sees the full working sequence, and no stage starts before the previous one has
/// settled every element. The length of the sequence never changes and outputs keep the order
/// of their inputs.
pub trait StagedMapper {
    type Input;
    type Output;
    type Error;
    type Future<'a>: Future<Output = Result<Vec<Self::Output>, Self::Error>>
    where
        Self: 'a;

    /// Maps every input through the pipeline.
    ///
    /// The first stage is applied to every element no later than the first poll of the returned
    /// future. `Barrier`, `Sequence` and `map` do it before returning, while `Spawned` waits for
    /// the first poll to spawn its tasks. Later stages only start once the returned future is
    /// polled past the previous barrier.
    fn map_all(&self, inputs: Vec<Self::Input>) -> Self::Future<'_>;

    /// Appends another mapper after this one.
    fn link<B>(self, next: B) -> Link<Self, B>
    where
        Self: Sized,
        B: StagedMapper<Input = Self::Output, Error = Self::Error>,
    {
        link(self, next)
    }

    /// Appends a stage after this mapper, behind its own barrier.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fmait::prelude::*;
    /// # use tokio_test::assert_ok;
    /// let pipeline = pipeline::empty::<i32, ()>()
    ///     .stage(stage::from_fn(|x: i32| x + 1))
    ///     .stage(stage::from_fn(|x: i32| x * 2));
    /// let output = assert_ok!(tokio_test::block_on(pipeline.map_all(vec![1, 2, 3])));
    /// assert_eq!(output, vec![4, 6, 8]);
    /// ```
    fn stage<S>(self, stage: S) -> Link<Self, Barrier<S>>
    where
        Self: Sized,
        S: Stage<Input = Self::Output, Error = Self::Error>,
    {
        link(self, Barrier::new(stage))
    }
}

/// Maps `initial` through every stage in order.
///
/// Every stage is applied to every element of the working sequence at once, and the working
/// sequence is replaced by the joined results before the next stage begins. The first stage is
/// applied before this returns. With no stages the initial sequence is returned unchanged. The
/// first error to settle aborts the whole call and is returned exactly as the stage produced it.
///
/// # Parameters
/// - `stages`: The stages, in execution order.
/// - `initial`: The initial working sequence.
///
/// # Examples
///
/// ```
/// # use fmait::stage::{self, StageExt};
/// # use tokio_test::{assert_err, assert_ok};
/// let stages = vec![
///     stage::try_from_fn(|x: i32| if x == 2 { Err("two") } else { Ok(x) }).boxed(),
///     stage::from_fn(|x: i32| x * 2).boxed(),
/// ];
/// assert_ok!(tokio_test::block_on(fmait::map(&stages, vec![1, 3])));
/// assert_err!(tokio_test::block_on(fmait::map(&stages, vec![1, 2, 3])));
/// ```
pub fn map<I, S, T>(stages: I, initial: Vec<T>) -> StagedMap<I::IntoIter, S>
where
    I: IntoIterator<Item = S>,
    S: Stage<Input = T, Output = T>,
{
    let mut stages = stages.into_iter();
    let mut index = 0;
    let (working, barrier) = match stages.next() {
        Some(stage) => (None, Some(launch_stage(&stage, &mut index, initial))),
        None => (Some(initial), None),
    };
    StagedMap {
        stages,
        index,
        working,
        barrier,
    }
}

fn launch_stage<S>(stage: &S, index: &mut usize, working: Vec<S::Input>) -> StageBarrier<S::Future>
where
    S: Stage,
{
    let span = debug_span!("stage", index = *index, width = working.len());
    *index += 1;
    StageBarrier::launch(span, working.into_iter().map(|input| stage.apply(input)))
}

pin_project! {
    /// Future returned by `map`.
    pub struct StagedMap<It, S>
    where
        S: Stage,
    {
        stages: It,
        index: usize,
        working: Option<Vec<S::Input>>,
        #[pin]
        barrier: Option<StageBarrier<S::Future>>,
    }
}

impl<It, S, T> Future for StagedMap<It, S>
where
    It: Iterator<Item = S>,
    S: Stage<Input = T, Output = T>,
{
    type Output = Result<Vec<T>, S::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut me = self.project();
        loop {
            if let Some(barrier) = me.barrier.as_mut().as_pin_mut() {
                let result = ready!(barrier.poll(cx));
                me.barrier.set(None);
                *me.working = Some(result?);
            }

            let working = match me.working.take() {
                Some(working) => working,
                None => panic!("`StagedMap` polled after completion"),
            };
            let stage = match me.stages.next() {
                Some(stage) => stage,
                None => return Poll::Ready(Ok(working)),
            };

            me.barrier.set(Some(launch_stage(&stage, &mut *me.index, working)));
        }
    }
}

/// An owned list of stages sharing one element type.
pub struct Sequence<S> {
    stages: Vec<S>,
}

impl<S> Sequence<S> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage to the end of the sequence.
    pub fn push(&mut self, stage: S) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn into_inner(self) -> Vec<S> {
        self.stages
    }
}

impl<S> Default for Sequence<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> From<Vec<S>> for Sequence<S> {
    fn from(stages: Vec<S>) -> Self {
        Self { stages }
    }
}

impl<S> FromIterator<S> for Sequence<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

impl<S> Extend<S> for Sequence<S> {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.stages.extend(iter)
    }
}

impl<S, T> StagedMapper for Sequence<S>
where
    S: Stage<Input = T, Output = T>,
{
    type Input = T;
    type Output = T;
    type Error = S::Error;
    type Future<'a> = StagedMap<std::slice::Iter<'a, S>, &'a S> where Self: 'a;

    fn map_all(&self, inputs: Vec<T>) -> Self::Future<'_> {
        map(&self.stages, inputs)
    }
}

/// Creates a mapper with no stages.
pub fn empty<T, E>() -> Empty<T, E> {
    Empty {
        _marker: PhantomData,
    }
}

/// The mapper with no stages, which resolves to its input unchanged.
pub struct Empty<T, E> {
    _marker: PhantomData<fn(T) -> (T, E)>,
}

impl<T, E> Default for Empty<T, E> {
    fn default() -> Self {
        empty()
    }
}

impl<T, E> StagedMapper for Empty<T, E> {
    type Input = T;
    type Output = T;
    type Error = E;
    type Future<'a> = Ready<Result<Vec<T>, E>> where Self: 'a;

    fn map_all(&self, inputs: Vec<T>) -> Self::Future<'_> {
        future::ready(Ok(inputs))
    }
}

/// A trait extension for `Vec` which maps it through a mapper.
pub trait StagedMapExt<T> {
    /// Maps every element through the given mapper.
    fn map_through<M>(self, mapper: &M) -> M::Future<'_>
    where
        M: StagedMapper<Input = T>;
}

impl<T> StagedMapExt<T> for Vec<T> {
    fn map_through<M>(self, mapper: &M) -> M::Future<'_>
    where
        M: StagedMapper<Input = T>,
    {
        mapper.map_all(self)
    }
}
