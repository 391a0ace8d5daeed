// Resource lifecycle scenarios
//
// Single-threaded init/exit bodies using the subsystem models directly.

use envmodel_core::models::{block, dma, module, urb, Gfp, MODULE_REFCOUNT};
use envmodel_core::ENOMEM;
use envmodel_error::PropertyId;

use super::BuiltinScenario;
use crate::scenario::{FnModule, Module};

const ENOMEM_STATUS: i32 = -(ENOMEM as i32);

pub(super) const SCENARIOS: &[BuiltinScenario] = &[
    BuiltinScenario {
        name: "block-request-safe",
        description: "Sleeping and atomic request allocations, each put exactly once",
        expected: &[],
        load: block_request_safe,
    },
    BuiltinScenario {
        name: "block-request-double-get",
        description: "A second request is taken while the first is still held",
        expected: &["resource:linux:block:request:double-acquire"],
        load: block_request_double_get,
    },
    BuiltinScenario {
        name: "block-request-leak",
        description: "A request from make_request is never put back",
        expected: &["resource:linux:block:request:leak"],
        load: block_request_leak,
    },
    BuiltinScenario {
        name: "urb-counter",
        description: "An urb with an extra reference, freed once per reference",
        expected: &[],
        load: urb_counter,
    },
    BuiltinScenario {
        name: "urb-leak",
        description: "An urb with an extra reference, freed only once",
        expected: &["resource:linux:usb:urb:leak"],
        load: urb_leak,
    },
    BuiltinScenario {
        name: "dma-unchecked-mapping",
        description: "A DMA mapping is replaced before its error check",
        expected: &[
            "resource:linux:arch:dma-mapping:limit-exceeded",
            "resource:linux:arch:dma-mapping:leak",
        ],
        load: dma_unchecked_mapping,
    },
    BuiltinScenario {
        name: "module-refcount",
        description: "A module reference taken twice and dropped twice",
        expected: &[],
        load: module_refcount,
    },
    BuiltinScenario {
        name: "null-dereference",
        description: "An allocation result is dereferenced without a null check",
        expected: &["test:expected-memory-fault:null-dereference"],
        load: null_dereference,
    },
];

fn block_request_safe() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let request = block::get_request(env, Gfp::KERNEL)?;
        block::put_request(env, request);

        let request = block::get_request(env, Gfp::ATOMIC)?;
        if request.is_null() {
            return Ok(ENOMEM_STATUS);
        }
        block::put_request(env, request);
        Ok(0)
    }))
}

fn block_request_double_get() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let request = block::get_request(env, Gfp::KERNEL)?;
        block::get_request(env, Gfp::KERNEL)?;
        block::put_request(env, request);
        Ok(0)
    }))
}

fn block_request_leak() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let request = block::make_request(env, Gfp::ATOMIC)?;
        if request.is_err() {
            return Ok(ENOMEM_STATUS);
        }
        Ok(0)
    }))
}

fn urb_counter() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let urb = urb::alloc_urb(env)?;
        if urb.is_null() {
            return Ok(ENOMEM_STATUS);
        }
        let extra = urb::get_urb(env, urb)?;
        urb::free_urb(env, extra);
        urb::free_urb(env, urb);
        Ok(0)
    }))
}

fn urb_leak() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let urb = urb::alloc_urb(env)?;
        if urb.is_null() {
            return Ok(ENOMEM_STATUS);
        }
        urb::get_urb(env, urb)?;
        urb::free_urb(env, urb);
        Ok(0)
    }))
}

fn dma_unchecked_mapping() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        dma::map_single(env);
        let addr = dma::map_single(env);
        if dma::mapping_error(env, addr) != 0 {
            return Ok(ENOMEM_STATUS);
        }
        Ok(0)
    }))
}

fn module_refcount() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let owner = env.arbitrary_ptr();
        env.assume(!owner.is_err())?;
        if module::try_module_get(env, owner) == 0 {
            return Ok(-1);
        }
        module::module_get(env, owner);

        let expected = if owner.is_null() { 0 } else { 2 };
        let refcount = module::module_refcount(env, owner);
        env.assert_named(
            PropertyId::resource(MODULE_REFCOUNT.name, "refcount"),
            refcount == expected,
        );

        module::module_put(env, owner);
        module::module_put(env, owner);
        Ok(0)
    }))
}

fn null_dereference() -> Box<dyn Module> {
    Box::new(FnModule::new(|env| {
        let buffer = env.arbitrary_ptr();
        env.dereference(buffer, true)?;
        Ok(0)
    }))
}
