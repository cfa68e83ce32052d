//! Type-erased environments.
//!
//! Factories choose the set of layers at runtime, so the concrete type of a
//! composed environment is not known statically. [`BoxedEnv`] hides it behind a
//! trait object while staying cloneable, which pools need to copy a template.
use crate::{record::Record, Act, BoxSpace, Env, GymAct, GymInfo, Info, Obs, Step};
use anyhow::Result;

/// Object-safe view of a cloneable [`Env`].
///
/// Implemented for every `Env + Clone + 'static`.
pub trait DynEnv<O: Obs, A: Act, I: Info>: Env<Obs = O, Act = A, Info = I> {
    /// Clones the environment into a new box.
    fn clone_box(&self) -> Box<dyn DynEnv<O, A, I>>;

    /// Performs a step through the trait object.
    fn step_dyn(&mut self, a: &A) -> Result<(Step<BoxedEnv<O, A, I>>, Record)>;
}

impl<T, O, A, I> DynEnv<O, A, I> for T
where
    T: Env<Obs = O, Act = A, Info = I> + Clone + 'static,
    O: Obs,
    A: Act,
    I: Info,
{
    fn clone_box(&self) -> Box<dyn DynEnv<O, A, I>> {
        Box::new(self.clone())
    }

    fn step_dyn(&mut self, a: &A) -> Result<(Step<BoxedEnv<O, A, I>>, Record)> {
        let (step, record) = self.step(a)?;
        Ok((step.cast(), record))
    }
}

/// A cloneable, type-erased environment.
pub struct BoxedEnv<O, A = GymAct, I = GymInfo>(Box<dyn DynEnv<O, A, I>>)
where
    O: Obs,
    A: Act,
    I: Info;

impl<O, A, I> BoxedEnv<O, A, I>
where
    O: Obs,
    A: Act,
    I: Info,
{
    /// Boxes an environment.
    pub fn new<T>(env: T) -> Self
    where
        T: Env<Obs = O, Act = A, Info = I> + Clone + 'static,
    {
        Self(Box::new(env))
    }
}

impl<O, A, I> Clone for BoxedEnv<O, A, I>
where
    O: Obs,
    A: Act,
    I: Info,
{
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<O, A, I> Env for BoxedEnv<O, A, I>
where
    O: Obs,
    A: Act,
    I: Info,
{
    type Obs = O;
    type Act = A;
    type Info = I;

    fn observation_space(&self) -> &BoxSpace {
        self.0.observation_space()
    }

    fn reset(&mut self) -> Result<O> {
        self.0.reset()
    }

    fn step(&mut self, a: &A) -> Result<(Step<Self>, Record)> {
        self.0.step_dyn(a)
    }

    fn close(&mut self) -> Result<()> {
        self.0.close()
    }

    fn seed(&mut self, seed: u64) {
        self.0.seed(seed)
    }
}

#[cfg(test)]
mod test {
    use super::BoxedEnv;
    use crate::{dummy::DummyEnv, Env, GymAct};
    use anyhow::Result;

    #[test]
    fn test_boxed_clone_is_independent() -> Result<()> {
        let mut env = BoxedEnv::new(DummyEnv::new(3, 5));
        env.reset()?;
        let mut copy = env.clone();

        let (step, _) = env.step(&GymAct::Discrete(1))?;
        assert_eq!(step.obs[[0]], 1.0);

        // The copy was taken before the step
        let (step, _) = copy.step(&GymAct::Discrete(1))?;
        assert_eq!(step.obs[[0]], 1.0);
        let (step, _) = env.step(&GymAct::Discrete(1))?;
        assert_eq!(step.obs[[0]], 2.0);
        Ok(())
    }
}
