use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

/// Closure adapters which turn plain functions into stages.
pub mod adapter;

pub use adapter::{from_async, from_fn, identity, try_from_async, try_from_fn};

/// The future produced by an erased stage.
pub type StageFuture<'a, O, E> = BoxFuture<'a, Result<O, E>>;

/// A unary transformation applied to a single element of the working sequence.
///
/// The future returned by `apply` does not borrow the stage, which lets a barrier create the
/// future of every element up front and join them afterwards.
pub trait Stage {
    type Input;
    type Output;
    type Error;
    type Future: Future<Output = Result<Self::Output, Self::Error>>;

    /// Starts the transformation of a single element.
    fn apply(&self, input: Self::Input) -> Self::Future;
}

impl<S: Stage + ?Sized> Stage for &S {
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;
    type Future = S::Future;

    fn apply(&self, input: Self::Input) -> Self::Future {
        (**self).apply(input)
    }
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;
    type Future = S::Future;

    fn apply(&self, input: Self::Input) -> Self::Future {
        (**self).apply(input)
    }
}

impl<S: Stage + ?Sized> Stage for Arc<S> {
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;
    type Future = S::Future;

    fn apply(&self, input: Self::Input) -> Self::Future {
        (**self).apply(input)
    }
}

/// An owned stage with its concrete type erased.
pub type BoxedStage<'a, I, O, E> =
    Box<dyn Stage<Input = I, Output = O, Error = E, Future = StageFuture<'a, O, E>> + Send + Sync + 'a>;

/// A shareable stage with its concrete type erased.
pub type ShareStage<'a, I, O, E> =
    Arc<dyn Stage<Input = I, Output = O, Error = E, Future = StageFuture<'a, O, E>> + Send + Sync + 'a>;

/// Boxes the future of the inner stage so stages of different types can live in one list.
pub struct Erased<'a, S> {
    stage: S,
    _lifetime: PhantomData<&'a ()>,
}

impl<'a, S> Erased<'a, S> {
    pub fn new(stage: S) -> Self {
        Self {
            stage,
            _lifetime: PhantomData,
        }
    }

    pub fn into_inner(self) -> S {
        self.stage
    }
}

impl<'a, S> Stage for Erased<'a, S>
where
    S: Stage,
    S::Future: Send + 'a,
{
    type Input = S::Input;
    type Output = S::Output;
    type Error = S::Error;
    type Future = StageFuture<'a, S::Output, S::Error>;

    fn apply(&self, input: Self::Input) -> Self::Future {
        Box::pin(self.stage.apply(input))
    }
}

/// A trait extension for `Stage` which erases the stage type.
pub trait StageExt: Stage {
    /// Erases the stage into a `BoxedStage`.
    ///
    /// # Examples
    ///
    /// Stages built from different closures can be stored together once boxed:
    /// ```
    /// # use std::convert::Infallible;
    /// # use fmait::stage::{self, BoxedStage, StageExt};
    /// let stages: Vec<BoxedStage<'static, i32, i32, Infallible>> = vec![
    ///     stage::from_fn(|x: i32| x - 1).boxed(),
    ///     stage::from_async(|x: i32| async move { x * 10 }).boxed(),
    /// ];
    /// assert_eq!(stages.len(), 2);
    /// ```
    fn boxed<'a>(self) -> BoxedStage<'a, Self::Input, Self::Output, Self::Error>
    where
        Self: Sized + Send + Sync + 'a,
        Self::Future: Send + 'a,
    {
        Box::new(Erased::new(self))
    }

    /// Erases the stage into a `ShareStage`.
    fn shared<'a>(self) -> ShareStage<'a, Self::Input, Self::Output, Self::Error>
    where
        Self: Sized + Send + Sync + 'a,
        Self::Future: Send + 'a,
    {
        Arc::new(Erased::new(self))
    }
}

impl<S: Stage + ?Sized> StageExt for S {}

#[cfg(test)]
mod tests {
    use super::{Stage, StageExt};
    use crate::error::StageError;
    use crate::stage;
    use std::convert::Infallible;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_boxed_stage_delegates() -> Result<(), Infallible> {
        let boxed = stage::from_fn::<_, _, _, Infallible>(|x: u8| u16::from(x) << 4).boxed();
        assert_eq!(boxed.apply(3).await?, 48);
        assert_eq!((&boxed).apply(1).await?, 16);
        Ok(())
    }

    #[tokio::test]
    async fn test_shared_stage_clones_share_state() -> Result<(), Infallible> {
        let shared = stage::from_fn::<_, _, _, Infallible>(|s: &'static str| s.len()).shared();
        let other = Arc::clone(&shared);
        assert_eq!(shared.apply("abc").await?, 3);
        assert_eq!(other.apply("abcdef").await?, 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_boxed_stage_keeps_error() {
        let boxed = stage::try_from_fn(|s: &str| s.parse::<i32>().map_err(StageError::from)).boxed();
        let error = boxed.apply("nope").await.unwrap_err();
        assert!(matches!(error, StageError::Parse(_)));
    }
}
