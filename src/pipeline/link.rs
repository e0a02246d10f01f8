use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use pin_project_lite::pin_project;

use super::StagedMapper;

/// Links two mappers so that `second` only starts once `first` has settled every element.
///
/// # Parameters
/// - `first`: The mapper run on the initial sequence.
/// - `second`: The mapper run on the output of `first`.
pub fn link<A, B>(first: A, second: B) -> Link<A, B>
where
    A: StagedMapper,
    B: StagedMapper<Input = A::Output, Error = A::Error>,
{
    Link { first, second }
}

/// Two mappers run one after another, with a barrier in between.
pub struct Link<A, B> {
    first: A,
    second: B,
}

impl<A, B> Link<A, B> {
    pub fn into_outer(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A, B> StagedMapper for Link<A, B>
where
    A: StagedMapper,
    B: StagedMapper<Input = A::Output, Error = A::Error>,
{
    type Input = A::Input;
    type Output = B::Output;
    type Error = A::Error;
    type Future<'a> = LinkFuture<'a, A::Future<'a>, B, B::Future<'a>> where Self: 'a;

    fn map_all(&self, inputs: Vec<Self::Input>) -> Self::Future<'_> {
        LinkFuture {
            second: &self.second,
            first_future: Some(self.first.map_all(inputs)),
            second_future: None,
        }
    }
}

pin_project! {
    /// Future returned by `Link::map_all`.
    pub struct LinkFuture<'a, F, B, G> {
        second: &'a B,
        #[pin]
        first_future: Option<F>,
        #[pin]
        second_future: Option<G>,
    }
}

impl<'a, F, B, G> Future for LinkFuture<'a, F, B, G>
where
    B: StagedMapper<Future<'a> = G> + 'a,
    F: Future<Output = Result<Vec<B::Input>, B::Error>>,
    G: Future<Output = Result<Vec<B::Output>, B::Error>>,
{
    type Output = Result<Vec<B::Output>, B::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut me = self.project();
        if let Some(first) = me.first_future.as_mut().as_pin_mut() {
            let outputs = match ready!(first.poll(cx)) {
                Ok(outputs) => outputs,
                Err(error) => {
                    me.first_future.set(None);
                    return Poll::Ready(Err(error));
                }
            };
            me.first_future.set(None);
            let second: &'a B = *me.second;
            me.second_future.set(Some(second.map_all(outputs)));
        }
        match me.second_future.as_pin_mut() {
            Some(second) => second.poll(cx),
            None => panic!("`LinkFuture` polled after completion"),
        }
    }
}

/// Links every given stage behind its own `Barrier`.
///
/// # Examples
///
/// ```
/// # use fmait::link;
/// # use fmait::prelude::*;
/// let pipeline = link!(
///     stage::from_fn(|s: &str| s.len()),
///     stage::try_from_fn(|n: usize| u8::try_from(n)),
///     stage::from_fn(|n: u8| n.count_ones())
/// );
/// let output = tokio_test::block_on(pipeline.map_all(vec!["a", "abc", "abcdefg"]));
/// assert_eq!(output.unwrap(), vec![1, 2, 3]);
/// ```
#[macro_export]
macro_rules! link {
    ($l1:expr $(,)?) => {
        $crate::pipeline::Barrier::new($l1)
    };
    ($l1:expr, $($etc:expr),+ $(,)?) => {
        $crate::pipeline::link($crate::pipeline::Barrier::new($l1), $crate::link!($($etc),+))
    };
}

#[cfg(test)]
mod tests {
    use super::link;
    use crate::pipeline::{Barrier, StagedMapper};
    use crate::stage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_link_changes_types() -> Result<(), String> {
        let pipeline = link(
            Barrier::new(stage::from_fn::<_, _, _, String>(|x: u8| u32::from(x) * 1000)),
            Barrier::new(stage::from_fn(|x: u32| x.to_string())),
        );
        let output = pipeline.map_all(vec![1, 2]).await?;
        assert_eq!(output, vec!["1000".to_string(), "2000".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_link_defers_second_until_polled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = crate::link!(
            stage::identity::<i32, ()>(),
            stage::from_fn(move |x: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                x
            }),
        );

        let pending = pipeline.map_all(vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(pending.await, Ok(vec![1, 2, 3]));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_link_skips_second_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = Barrier::new(stage::try_from_fn(|x: i32| if x > 1 { Err(x) } else { Ok(x) }))
            .stage(stage::from_fn(move |x: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                x
            }));

        assert_eq!(pipeline.map_all(vec![0, 1, 2]).await, Err(2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_into_outer() -> Result<(), ()> {
        let (first, second) =
            link(Barrier::new(stage::identity::<u8, ()>()), Barrier::new(stage::identity())).into_outer();
        assert_eq!(first.map_all(vec![4]).await?, vec![4]);
        assert_eq!(second.map_all(vec![5]).await?, vec![5]);
        Ok(())
    }
}
