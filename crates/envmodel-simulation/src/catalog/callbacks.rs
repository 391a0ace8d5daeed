// Callback ordering scenarios
//
// Drivers register an operations structure in init and the environment
// calls into it from a logical thread until exit deregisters it.

use envmodel_core::{Environment, Handle, Step, ENOMEM};

use super::BuiltinScenario;
use crate::scenario::{FnModule, LogicalThread, Module, StepThread};

const TTY: &str = "tty";
const TTY_DATA: &str = "tty:driver-data";
const USB_SERIAL: &str = "usb-serial";
const USB_SERIAL_PORT: &str = "usb-serial:port";
const NETDEV: &str = "netdev";
const MANUAL: &str = "manual";

pub(super) const SCENARIOS: &[BuiltinScenario] = &[
    BuiltinScenario {
        name: "tty-driver-registration",
        description: "A tty driver whose open/write/close run only while registered",
        expected: &[],
        load: tty_driver_registration,
    },
    BuiltinScenario {
        name: "usb-serial-deregistration",
        description: "Probe and disconnect between usb-serial registration and deregistration",
        expected: &[],
        load: usb_serial_deregistration,
    },
    BuiltinScenario {
        name: "net-device-callbacks",
        description: "Transmit runs only between a successful open and close",
        expected: &[],
        load: net_device_callbacks,
    },
    BuiltinScenario {
        name: "manual-model",
        description: "Registration that may fail, one callback, deregistration at exit",
        expected: &[],
        load: manual_model,
    },
    BuiltinScenario {
        name: "xmit-before-open",
        description: "Transmit is invoked before the device was opened",
        expected: &["callback:netdev:middle-not-started"],
        load: xmit_before_open,
    },
    BuiltinScenario {
        name: "double-registration",
        description: "The same driver structure is registered twice",
        expected: &["callback:driver:already-registered"],
        load: double_registration,
    },
    BuiltinScenario {
        name: "missing-deregistration",
        description: "A driver stays registered after the module is unloaded",
        expected: &["callback:misc:registered-at-exit"],
        load: missing_deregistration,
    },
    BuiltinScenario {
        name: "no-exit-module",
        description: "A module without exit whose handler is still reached",
        expected: &["test:expected-error:reached"],
        load: no_exit_module,
    },
];

/// Narrow an oracle integer to an init status. Values outside `int` range
/// still read as failure.
fn init_status(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MIN)
}

//-----------------------------------------------------------------------------
// TTY
//-----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TtyDriver {
    port: u64,
}

impl Module for TtyDriver {
    fn init(&mut self, env: &mut Environment<'_>) -> Step<i32> {
        let Some(port) = Handle::from_pointer(env.arbitrary_ptr()) else {
            return Ok(-(ENOMEM as i32));
        };
        self.port = port.address();
        env.register(TTY);
        Ok(0)
    }

    fn has_exit(&self) -> bool {
        true
    }

    fn exit(&mut self, env: &mut Environment<'_>) -> Step<()> {
        env.deregister(TTY);
        Ok(())
    }

    fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
        vec![Box::new(TtyOps {
            port: self.port,
            opened: false,
            next: 0,
        })]
    }
}

/// open, write, close
#[derive(Debug)]
struct TtyOps {
    port: u64,
    opened: bool,
    next: usize,
}

impl LogicalThread for TtyOps {
    fn name(&self) -> &str {
        "tty-ops"
    }

    fn step(&mut self, env: &mut Environment<'_>) -> Step<bool> {
        match self.next {
            0 => {
                self.opened = env.arbitrary_nonpositive_int() == 0;
                if self.opened {
                    env.start(TTY);
                    env.store_resource(TTY_DATA, self.port);
                }
            }
            1 if self.opened => {
                env.invoke_middle_callback(TTY);
            }
            2 if self.opened => {
                env.check_resource(TTY_DATA, self.port);
                env.stop(TTY);
            }
            _ => {}
        }
        self.next += 1;
        Ok(self.next < 3)
    }
}

fn tty_driver_registration() -> Box<dyn Module> {
    Box::new(TtyDriver::default())
}

//-----------------------------------------------------------------------------
// USB Serial
//-----------------------------------------------------------------------------

fn usb_serial_deregistration() -> Box<dyn Module> {
    struct UsbSerial;

    impl Module for UsbSerial {
        fn init(&mut self, env: &mut Environment<'_>) -> Step<i32> {
            let status = env.arbitrary_nonpositive_int();
            if status == 0 {
                env.register(USB_SERIAL);
            }
            Ok(init_status(status))
        }

        fn has_exit(&self) -> bool {
            true
        }

        fn exit(&mut self, env: &mut Environment<'_>) -> Step<()> {
            env.deregister(USB_SERIAL);
            Ok(())
        }

        fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
            vec![StepThread::new("probe-disconnect")
                .step(|env| {
                    env.invoke_callback(USB_SERIAL);
                    if let Some(port) = Handle::from_pointer(env.arbitrary_ptr()) {
                        env.store_resource(USB_SERIAL_PORT, port.address());
                    }
                    Ok(())
                })
                .step(|env| {
                    env.invoke_callback(USB_SERIAL);
                    if let Some(port) = env.state().slots().get(USB_SERIAL_PORT) {
                        env.check_resource(USB_SERIAL_PORT, port);
                    }
                    Ok(())
                })
                .boxed()]
        }
    }

    Box::new(UsbSerial)
}

//-----------------------------------------------------------------------------
// Network Devices
//-----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct NetDeviceOps {
    opened: bool,
    next: usize,
}

impl LogicalThread for NetDeviceOps {
    fn name(&self) -> &str {
        "netdev-ops"
    }

    fn step(&mut self, env: &mut Environment<'_>) -> Step<bool> {
        match self.next {
            0 => {
                self.opened = env.arbitrary_nonpositive_int() == 0;
                if self.opened {
                    env.start(NETDEV);
                }
            }
            1 if self.opened => {
                env.invoke_middle_callback(NETDEV);
            }
            2 if self.opened => {
                env.stop(NETDEV);
            }
            _ => {}
        }
        self.next += 1;
        Ok(self.next < 3)
    }
}

fn register_netdev(env: &mut Environment<'_>) -> Step<i32> {
    env.register(NETDEV);
    Ok(0)
}

fn net_device_callbacks() -> Box<dyn Module> {
    struct NetDevice;

    impl Module for NetDevice {
        fn init(&mut self, env: &mut Environment<'_>) -> Step<i32> {
            register_netdev(env)
        }

        fn has_exit(&self) -> bool {
            true
        }

        fn exit(&mut self, env: &mut Environment<'_>) -> Step<()> {
            env.deregister(NETDEV);
            Ok(())
        }

        fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
            vec![Box::new(NetDeviceOps::default())]
        }
    }

    Box::new(NetDevice)
}

fn xmit_before_open() -> Box<dyn Module> {
    struct EagerNetDevice;

    impl Module for EagerNetDevice {
        fn init(&mut self, env: &mut Environment<'_>) -> Step<i32> {
            register_netdev(env)
        }

        fn has_exit(&self) -> bool {
            true
        }

        fn exit(&mut self, env: &mut Environment<'_>) -> Step<()> {
            env.deregister(NETDEV);
            Ok(())
        }

        fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
            vec![StepThread::new("netdev-ops")
                .step(|env| {
                    env.invoke_middle_callback(NETDEV);
                    Ok(())
                })
                .step(|env| {
                    env.start(NETDEV);
                    Ok(())
                })
                .step(|env| {
                    env.stop(NETDEV);
                    Ok(())
                })
                .boxed()]
        }
    }

    Box::new(EagerNetDevice)
}

//-----------------------------------------------------------------------------
// Manual Model
//-----------------------------------------------------------------------------

fn manual_model() -> Box<dyn Module> {
    struct Manual;

    impl Module for Manual {
        fn init(&mut self, env: &mut Environment<'_>) -> Step<i32> {
            if env.arbitrary_bool() {
                env.register(MANUAL);
                return Ok(0);
            }
            Ok(init_status(env.arbitrary_negative_int()))
        }

        fn has_exit(&self) -> bool {
            true
        }

        fn exit(&mut self, env: &mut Environment<'_>) -> Step<()> {
            env.deregister(MANUAL);
            Ok(())
        }

        fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
            vec![StepThread::new("callback")
                .step(|env| {
                    env.invoke_callback(MANUAL);
                    Ok(())
                })
                .boxed()]
        }
    }

    Box::new(Manual)
}

//-----------------------------------------------------------------------------
// Registration Misuse
//-----------------------------------------------------------------------------

fn double_registration() -> Box<dyn Module> {
    Box::new(
        FnModule::new(|env| {
            env.register("driver");
            env.register("driver");
            Ok(0)
        })
        .with_exit(|env| {
            env.deregister("driver");
            Ok(())
        }),
    )
}

fn missing_deregistration() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        env.register("misc");
        Ok(0)
    }))
}

fn no_exit_module() -> Box<dyn Module> {
    struct NoExit;

    impl Module for NoExit {
        fn init(&mut self, _env: &mut Environment<'_>) -> Step<i32> {
            Ok(0)
        }

        fn threads(&mut self) -> Vec<Box<dyn LogicalThread>> {
            vec![StepThread::new("handler")
                .step(|env| {
                    env.invoke_reached();
                    Ok(())
                })
                .boxed()]
        }
    }

    Box::new(NoExit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmodel_core::{GuardState, ModelState, Pointer, Scripted, ScriptedOracle};

    #[test]
    fn failed_open_skips_the_remaining_callbacks() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Int(-1)]);
        let mut env = Environment::new(&mut state, &mut oracle);
        register_netdev(&mut env).unwrap();

        let mut ops = NetDeviceOps::default();
        while ops.step(&mut env).unwrap() {}
        assert_eq!(env.guard_state(NETDEV), GuardState::Registered);
        assert!(state.channel().is_clean());
    }

    #[test]
    fn wide_failure_statuses_stay_failures() {
        assert_eq!(init_status(0), 0);
        assert_eq!(init_status(-12), -12);
        assert_ne!(init_status(-4_294_967_296), 0);
        assert_ne!(init_status(1 << 32), 0);
    }

    #[test]
    fn manual_model_stays_unregistered_on_wide_failure() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Int(0), Scripted::Int(-4_294_967_296)]);
        let mut module = manual_model();

        let status = module.init(&mut Environment::new(&mut state, &mut oracle)).unwrap();
        assert_ne!(status, 0);
        assert_eq!(state.guard_state(MANUAL), GuardState::Unregistered);
    }

    #[test]
    fn tty_init_fails_without_a_port() {
        let mut state = ModelState::new();
        let mut oracle = ScriptedOracle::new([Scripted::Ptr(Pointer::Null)]);
        let mut driver = TtyDriver::default();

        let status = driver.init(&mut Environment::new(&mut state, &mut oracle)).unwrap();
        assert_eq!(status, -12);
        assert_eq!(state.guard_state(TTY), GuardState::Unregistered);
    }
}
