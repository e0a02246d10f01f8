use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::future::{self, Ready};
use pin_project_lite::pin_project;

use super::Stage;

/// Creates an infallible, synchronous stage from a function.
///
/// The error type is left open so the stage can be linked next to fallible stages.
///
/// # Examples
///
/// ```
/// # use std::convert::Infallible;
/// # use fmait::stage::{self, Stage};
/// let double = stage::from_fn(|x: i32| x * 2);
/// let result: Result<i32, Infallible> = tokio_test::block_on(double.apply(21));
/// assert_eq!(result.unwrap(), 42);
/// ```
pub fn from_fn<F, I, O, E>(function: F) -> FromFn<F, I, E>
where
    F: Fn(I) -> O,
{
    FromFn {
        function,
        _marker: PhantomData,
    }
}

/// Creates a fallible, synchronous stage from a function.
pub fn try_from_fn<F, I, O, E>(function: F) -> TryFromFn<F, I>
where
    F: Fn(I) -> Result<O, E>,
{
    TryFromFn {
        function,
        _marker: PhantomData,
    }
}

/// Creates an infallible, asynchronous stage from a function returning a future.
pub fn from_async<F, I, Fut, E>(function: F) -> FromAsync<F, I, E>
where
    F: Fn(I) -> Fut,
    Fut: Future,
{
    FromAsync {
        function,
        _marker: PhantomData,
    }
}

/// Creates a fallible, asynchronous stage from a function returning a future.
///
/// # Examples
///
/// ```
/// # use fmait::stage::{self, Stage};
/// # use tokio_test::{assert_err, assert_ok};
/// let checked = stage::try_from_async(|x: u8| async move { x.checked_add(200).ok_or("overflow") });
/// assert_ok!(tokio_test::block_on(checked.apply(55)));
/// assert_err!(tokio_test::block_on(checked.apply(56)));
/// ```
pub fn try_from_async<F, I, Fut, O, E>(function: F) -> TryFromAsync<F, I>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    TryFromAsync {
        function,
        _marker: PhantomData,
    }
}

/// Creates a stage which hands every element back untouched.
pub fn identity<T, E>() -> Identity<T, E> {
    Identity {
        _marker: PhantomData,
    }
}

pub struct FromFn<F, I, E> {
    function: F,
    _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, O, E> Stage for FromFn<F, I, E>
where
    F: Fn(I) -> O,
{
    type Input = I;
    type Output = O;
    type Error = E;
    type Future = Ready<Result<O, E>>;

    fn apply(&self, input: I) -> Self::Future {
        future::ready(Ok((self.function)(input)))
    }
}

pub struct TryFromFn<F, I> {
    function: F,
    _marker: PhantomData<fn(I)>,
}

impl<F, I, O, E> Stage for TryFromFn<F, I>
where
    F: Fn(I) -> Result<O, E>,
{
    type Input = I;
    type Output = O;
    type Error = E;
    type Future = Ready<Result<O, E>>;

    fn apply(&self, input: I) -> Self::Future {
        future::ready((self.function)(input))
    }
}

pub struct FromAsync<F, I, E> {
    function: F,
    _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, Fut, E> Stage for FromAsync<F, I, E>
where
    F: Fn(I) -> Fut,
    Fut: Future,
{
    type Input = I;
    type Output = Fut::Output;
    type Error = E;
    type Future = OkFuture<Fut, E>;

    fn apply(&self, input: I) -> Self::Future {
        OkFuture {
            inner: (self.function)(input),
            _error: PhantomData,
        }
    }
}

pub struct TryFromAsync<F, I> {
    function: F,
    _marker: PhantomData<fn(I)>,
}

impl<F, I, Fut, O, E> Stage for TryFromAsync<F, I>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    type Input = I;
    type Output = O;
    type Error = E;
    type Future = Fut;

    fn apply(&self, input: I) -> Self::Future {
        (self.function)(input)
    }
}

pub struct Identity<T, E> {
    _marker: PhantomData<fn(T) -> (T, E)>,
}

impl<T, E> Stage for Identity<T, E> {
    type Input = T;
    type Output = T;
    type Error = E;
    type Future = Ready<Result<T, E>>;

    fn apply(&self, input: T) -> Self::Future {
        future::ready(Ok(input))
    }
}

pin_project! {
    /// Lifts the output of an infallible future into `Ok`.
    pub struct OkFuture<Fut, E> {
        #[pin]
        inner: Fut,
        _error: PhantomData<fn() -> E>,
    }
}

impl<Fut: Future, E> Future for OkFuture<Fut, E> {
    type Output = Result<Fut::Output, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.project();
        let output = ready!(me.inner.poll(cx));
        Poll::Ready(Ok(output))
    }
}
