//! Shapes demo
//!
//! This example shows:
//! - Registering roles, behaviours and a base type in a catalog
//! - Composing the same roles with different behaviour sets
//! - Plain, continuation-aware and message-style bodies cooperating in one chain
//! - Per-instance behaviour state

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cim_composite::{
    BaseType, BehaviourDescriptor, Catalog, Composer, CompositeCache, CompositionKey,
    MethodSignature, ObjectRef, RoleDescriptor, Shape, Value,
};

/// Target record shared by every shape composite
#[derive(Debug)]
struct Figure {
    name: &'static str,
    size: f64,
}

#[derive(Default)]
struct Calls(AtomicUsize);

fn figure(frame_target: &ObjectRef) -> anyhow::Result<&Figure> {
    frame_target
        .downcast_ref::<Figure>()
        .ok_or_else(|| anyhow::anyhow!("target is not a Figure"))
}

fn catalog() -> anyhow::Result<Catalog> {
    let area = || MethodSignature::new("area", Shape::Double);
    let label = || MethodSignature::new("label", Shape::Text);

    let mut catalog = Catalog::new();
    catalog.register_role(
        RoleDescriptor::builder("Shape")
            .method(area())
            .method(label())
            .build(),
    )?;
    catalog.register_role(
        RoleDescriptor::builder("Counted")
            .method(MethodSignature::new("calls", Shape::Int))
            .build(),
    )?;

    catalog.register_base(
        BaseType::new("Drawing").concrete(label(), |frame| {
            let name = frame
                .target()
                .downcast_ref::<Figure>()
                .map(|f| f.name)
                .unwrap_or("figure");
            Ok(Value::text(name))
        }),
    )?;

    catalog.register_behaviour(
        BehaviourDescriptor::builder("Square")
            .stateless()
            .provides("Shape")
            .plain(area(), |frame| {
                let size = frame.target().downcast_ref::<Figure>().map_or(0.0, |f| f.size);
                Ok(Value::Double(size * size))
            })
            .build(),
    )?;
    catalog.register_behaviour(
        BehaviourDescriptor::builder("Circle")
            .stateless()
            .provides("Shape")
            .plain(area(), |frame| {
                let radius = frame.target().downcast_ref::<Figure>().map_or(0.0, |f| f.size);
                Ok(Value::Double(std::f64::consts::PI * radius * radius))
            })
            .build(),
    )?;
    catalog.register_behaviour(
        BehaviourDescriptor::builder("Doubled")
            .stateless()
            .message(area(), |_, msg| {
                let current = msg.response_value().as_double().unwrap_or_default();
                Ok(Value::Double(current * 2.0))
            })
            .build(),
    )?;
    catalog.register_behaviour(
        BehaviourDescriptor::builder("Fancy")
            .stateless()
            .continuing(label(), |_, chain| {
                let inner = chain.proceed()?;
                Ok(Value::text(format!("~{}~", inner.as_text().unwrap_or_default())))
            })
            .build(),
    )?;
    catalog.register_behaviour(
        BehaviourDescriptor::builder("Counter")
            .state::<Calls>()
            .provides("Counted")
            .plain(MethodSignature::new("calls", Shape::Int), |frame| {
                let calls = frame.state::<Calls>()?;
                Ok(Value::Int(calls.0.fetch_add(1, Ordering::SeqCst) as i64 + 1))
            })
            .build(),
    )?;

    Ok(catalog)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cache = CompositeCache::new(Composer::new(Arc::new(catalog()?)));

    let requests = [
        CompositionKey::new(Vec::<String>::new(), ["Square"]),
        CompositionKey::new(Vec::<String>::new(), ["Circle", "Doubled"]),
        CompositionKey::new(Vec::<String>::new(), ["Square", "Fancy", "Counter"]).with_base("Drawing"),
    ];

    for key in &requests {
        let descriptor = cache.get_or_compose(key)?;
        let instance = descriptor.instantiate(ObjectRef::new(
            "Drawing",
            Figure {
                name: "unit",
                size: 2.0,
            },
        ));

        println!("== {key}");
        println!("   roles: {:?}", descriptor.minimal_roles());
        println!("   target: {:?}", figure(instance.target())?);
        println!("   area  = {:?}", instance.invoke("area", vec![])?);
        println!("   label = {:?}", instance.invoke("label", vec![])?);
        if instance.implements("Counted") {
            instance.invoke("calls", vec![])?;
            println!("   calls = {:?}", instance.invoke("calls", vec![])?);
        }
        println!("{}", serde_json::to_string_pretty(&descriptor.summary())?);
    }

    // Same key in a different order is served from cache
    let again = cache.get_or_compose(&CompositionKey::new(Vec::<String>::new(), ["Doubled", "Circle"]))?;
    println!("cached descriptors: {}, reused: {}", cache.len(), again.implements("Shape"));

    Ok(())
}
