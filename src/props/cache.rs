//! # Plan Cache
//!
//! Process-wide mapping from record type to its compiled
//! [`StructProperties`]. The hit path takes a shared lock; a miss takes the
//! writer lock and runs the whole recursive plan build under it.
//!
//! Recursive type references are safe because a type's (empty) plan handle is
//! inserted *before* its fields are walked: a recursive lookup observes the
//! same `Arc` without re-entering the build. On error the partial entry is
//! removed, so a later call retries (and fails the same way) rather than
//! seeing a half-built plan.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::props::parse::{build_property, parse_reserved};
use crate::props::{PropsBody, StructProperties};
use crate::reflect::{ElementType, Message, TypeDescriptor};

type CacheMap = HashMap<TypeId, Arc<StructProperties>>;

static PLAN_CACHE: OnceLock<RwLock<CacheMap>> = OnceLock::new();

fn cache() -> &'static RwLock<CacheMap> {
    PLAN_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the compiled plan for the record type behind `desc`, building and
/// caching it on first observation. Every caller gets the same plan handle.
pub fn get_properties(desc: &'static TypeDescriptor) -> Result<Arc<StructProperties>> {
    let id = (desc.type_id)();

    // most lookups in a long-running program hit types seen before
    if let Some(sp) = cache().read().get(&id) {
        return Ok(sp.clone());
    }

    let mut map = cache().write();
    build_locked(&mut map, desc)
}

/// Typed convenience wrapper over [`get_properties`].
pub fn get_properties_of<M: Message>() -> Result<Arc<StructProperties>> {
    get_properties(M::descriptor())
}

fn build_locked(map: &mut CacheMap, desc: &'static TypeDescriptor) -> Result<Arc<StructProperties>> {
    let id = (desc.type_id)();
    if let Some(sp) = map.get(&id) {
        return Ok(sp.clone());
    }

    // insert the empty plan first so recursive references resolve to it
    let sp = Arc::new(StructProperties::new(desc.name, desc.module_path));
    map.insert(id, sp.clone());

    match build_body(map, desc) {
        Ok(body) => {
            sp.publish(body);
            Ok(sp)
        }
        Err(e) => {
            map.remove(&id);
            log::warn!("protoplan: error preparing field plan for {}: {e}", desc.name);
            Err(e)
        }
    }
}

fn build_body(map: &mut CacheMap, desc: &'static TypeDescriptor) -> Result<PropsBody> {
    let mut props = Vec::with_capacity(desc.fields.len());
    let mut reserved: Vec<u32> = Vec::new();

    for (index, field) in desc.fields.iter().enumerate() {
        if matches!((field.element)(), ElementType::Reserved) {
            parse_reserved(desc.name, field.tag, &mut reserved)?;
            continue;
        }

        let mut resolve = |d: &'static TypeDescriptor| build_locked(map, d);
        if let Some(prop) = build_property(field, index, &mut resolve)? {
            props.push(prop);
        }
    }

    reserved.sort_unstable();
    reserved.dedup();

    // sort by field number so encoding naturally emits in tag order
    props.sort_by_key(|p| p.field_number);

    let mut prev = 0u32;
    for p in &props {
        if p.field_number == prev {
            return Err(Error::DuplicateTag {
                owner: format!("{}.{}", desc.name, p.name),
                number: p.field_number,
            });
        }
        if reserved.binary_search(&p.field_number).is_ok() {
            return Err(Error::ReservedTag {
                owner: format!("{}.{}", desc.name, p.name),
                number: p.field_number,
            });
        }
        prev = p.field_number;
    }

    Ok(PropsBody { props, reserved })
}
