use anyhow::Result;
use gympool::{
    env_maker, make_env, make_image_env, CropFn, EnvConfig, ImageEnvConfig, Registry,
};
use gympool_core::{dummy::DummyImageEnv, BoxedEnv, Env, EnvError, GymAct};
use ndarray::{s, ArrayViewD, Ix3};
use tempdir::TempDir;
use test_log::test;

#[test]
fn test_cartpole_pool_from_yaml() -> Result<()> {
    let dir = TempDir::new("gympool")?;
    let path = dir.path().join("cartpole.yaml");
    EnvConfig::default()
        .env_id("CartPole-v1")
        .n_envs(4)
        .n_frames(2)
        .seed(3)
        .save(&path)?;

    let config = EnvConfig::load(&path)?;
    let registry = Registry::with_builtin();
    let mut pool = make_env(&registry, &config)?.into_pool().unwrap();
    assert_eq!(pool.n_envs(), 4);
    assert_eq!(pool.pool_states().shape(), &[4, 8]);

    // CartPole falls within its default step limit of 500
    let mut done = vec![false; 4];
    for _ in 0..500 {
        let step = pool.step(&vec![GymAct::Discrete(1); 4])?;
        for (d, &is_done) in done.iter_mut().zip(step.is_done.iter()) {
            *d |= is_done;
        }
    }
    assert!(done.iter().all(|&d| d));
    pool.close()?;
    Ok(())
}

#[test]
fn test_negative_seed_pool() -> Result<()> {
    let registry = Registry::with_builtin();
    let config = EnvConfig::default().env_id("CartPole-v1").n_envs(2).seed(-1);
    let mut pool = make_env(&registry, &config)?.into_pool().unwrap();
    assert_eq!(pool.pool_states().shape(), &[2, 4]);

    // Slots wrap around to seeds u64::MAX and 0
    let states = pool.pool_states();
    assert_ne!(states.index_axis(ndarray::Axis(0), 0), states.index_axis(ndarray::Axis(0), 1));

    let step = pool.step(&vec![GymAct::Discrete(0); 2])?;
    assert_eq!(step.reward, vec![1.0, 1.0]);
    Ok(())
}

#[test]
fn test_unknown_and_unavailable_ids() {
    let mut registry = Registry::with_builtin();
    registry.register_unavailable("DoomBasic-v0", "built without a Doom backend");

    let e = make_env(&registry, &EnvConfig::default().env_id("Pong-v0"))
        .err()
        .unwrap();
    assert_eq!(
        e.downcast_ref::<EnvError>(),
        Some(&EnvError::UnknownEnv("Pong-v0".to_string()))
    );

    let e = make_image_env(&registry, &ImageEnvConfig::default().env_id("DoomBasic-v0"))
        .err()
        .unwrap();
    assert_eq!(
        e.downcast_ref::<EnvError>(),
        Some(&EnvError::Unavailable {
            id: "DoomBasic-v0".to_string(),
            reason: "built without a Doom backend".to_string(),
        })
    );
}

#[test]
fn test_custom_image_backend_with_crop_fn() -> Result<()> {
    let mut registry = Registry::new();
    registry.register_image("Dummy-v0", Some(5), |_| {
        Ok(BoxedEnv::new(DummyImageEnv::new(80, 60, 3, 100)))
    });

    // Drops the top 20 rows, turning 80x60 into 60x60
    let crop = CropFn::new(|img: ArrayViewD<u8>| {
        let img = img.into_dimensionality::<Ix3>()?;
        Ok(img.slice(s![20.., .., ..]).to_owned().into_dyn())
    });
    let config = ImageEnvConfig::default()
        .env_id("Dummy-v0")
        .n_envs(0)
        .size(30, 30)
        .crop_fn(Some(crop));
    let mut env = make_image_env(&registry, &config)?.into_single().unwrap();
    assert_eq!(env.reset()?.shape(), &[30, 30, 1]);

    // The registered limit applies
    for i in 1..=5 {
        let (step, _) = env.step(&GymAct::Discrete(0))?;
        assert_eq!(step.is_truncated, i == 5);
    }
    Ok(())
}

#[test]
fn test_env_maker_binds_options() -> Result<()> {
    let make = env_maker(Registry::with_builtin(), EnvConfig::default().n_frames(3).seed(1));
    let mut pool = make("CartPole-v0", 2, Some(1))?.into_pool().unwrap();
    assert_eq!(pool.pool_states().shape(), &[2, 12]);

    // Every episode lasts one step
    let step = pool.step(&vec![GymAct::Discrete(0); 2])?;
    assert_eq!(step.is_done, vec![true, true]);
    Ok(())
}
