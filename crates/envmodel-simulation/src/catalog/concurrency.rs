// Locking and interleaving scenarios
//
// Logical threads step one atomic action at a time, so shared resources
// touched across steps are exposed to every interleaving.

use envmodel_core::models::{dma, lock};
use envmodel_core::{Environment, Step};

use super::BuiltinScenario;
use crate::scenario::{FnModule, LogicalThread, Module, StepThread};

const LOCK: u64 = 0x1000;
const EINTR: i32 = 4;

pub(super) const SCENARIOS: &[BuiltinScenario] = &[
    BuiltinScenario {
        name: "spinlock-double-lock",
        description: "A spinlock is taken twice and released twice",
        expected: &[
            "resource:linux:kernel:locking:spinlock:double-acquire",
            "resource:linux:kernel:locking:spinlock:double-release",
        ],
        load: spinlock_double_lock,
    },
    BuiltinScenario {
        name: "spinlock-sections",
        description: "Two threads each run a whole critical section in one step",
        expected: &[],
        load: spinlock_sections,
    },
    BuiltinScenario {
        name: "mutex-interruptible",
        description: "An interruptible lock is released only when it was taken",
        expected: &[],
        load: mutex_interruptible,
    },
    BuiltinScenario {
        name: "mutex-double-lock-thread",
        description: "A worker thread relocks a mutex it already holds and never unlocks it",
        expected: &[
            "resource:linux:kernel:locking:mutex:double-acquire",
            "resource:linux:kernel:locking:mutex:leak",
        ],
        load: mutex_double_lock_thread,
    },
    BuiltinScenario {
        name: "dma-mapping-race",
        description: "Two threads map and check through one shared mapping cell",
        expected: &["resource:linux:arch:dma-mapping:limit-exceeded"],
        load: dma_mapping_race,
    },
];

/// Module whose init succeeds and which only runs `threads`.
struct Threaded {
    threads: fn() -> Vec<Box<dyn LogicalThread>>,
}

impl Module for Threaded {
    fn init(&mut self, _env: &mut Environment<'_>) -> Step<i32> {
        Ok(0)
    }

    fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
        (self.threads)()
    }
}

fn spinlock_double_lock() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        lock::spin_lock(env, LOCK);
        lock::spin_lock(env, LOCK);
        lock::spin_unlock(env, LOCK);
        lock::spin_unlock(env, LOCK);
        Ok(0)
    }))
}

fn critical_section(name: &'static str) -> Box<dyn LogicalThread> {
    StepThread::new(name)
        .step(|env| {
            lock::spin_lock(env, LOCK);
            let counter = env.arbitrary_ulong();
            env.store_resource("counter", counter.wrapping_add(1));
            lock::spin_unlock(env, LOCK);
            Ok(())
        })
        .boxed()
}

fn spinlock_sections() -> Box<dyn Module> {
    Box::new(Threaded {
        threads: || vec![critical_section("writer-a"), critical_section("writer-b")],
    })
}

fn mutex_interruptible() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        if lock::mutex_lock_interruptible(env, LOCK) != 0 {
            return Ok(-EINTR);
        }
        if lock::mutex_trylock(env, LOCK + 1) != 0 {
            lock::mutex_unlock(env, LOCK + 1);
        }
        lock::mutex_unlock(env, LOCK);
        Ok(0)
    }))
}

fn mutex_double_lock_thread() -> Box<dyn Module> {
    Box::new(Threaded {
        threads: || {
            vec![StepThread::new("worker")
                .step(|env| {
                    lock::mutex_lock(env, LOCK);
                    Ok(())
                })
                .step(|env| {
                    lock::mutex_lock(env, LOCK);
                    Ok(())
                })
                .boxed()]
        },
    })
}

fn mapper(name: &'static str) -> Box<dyn LogicalThread> {
    StepThread::new(name)
        .step(move |env| {
            let addr = dma::map_single(env);
            env.store_resource(name, addr);
            Ok(())
        })
        .step(move |env| {
            let addr = env.state().slots().get(name).unwrap_or_default();
            dma::mapping_error(env, addr);
            Ok(())
        })
        .boxed()
}

fn dma_mapping_race() -> Box<dyn Module> {
    Box::new(Threaded {
        threads: || vec![mapper("mapper-a"), mapper("mapper-b")],
    })
}
