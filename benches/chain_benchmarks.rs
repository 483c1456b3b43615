use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;

use integration_runtime::endpoint::NullProducer;
use integration_runtime::lifecycle::StateManagedComponent;
use integration_runtime::message::{DefaultMessageFactory, MessageFactory};
use integration_runtime::service::{AddMetadataService, NullService, Service, ServiceCollection};
use integration_runtime::workflow::StandardWorkflow;

fn chain(len: usize) -> ServiceCollection {
    (0..len).fold(ServiceCollection::sequential("bench-chain"), |chain, i| {
        let service: Arc<dyn Service> = if i % 2 == 0 {
            Arc::new(AddMetadataService::new(format!("meta-{i}")).with_metadata(format!("k{i}"), "v"))
        } else {
            Arc::new(NullService::new(format!("null-{i}")))
        };
        chain.with_service(service)
    })
}

fn benchmark_sequential_chain(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let services = chain(10);
    runtime.block_on(async {
        services.request_init().await.expect("init");
        services.request_start().await.expect("start");
    });
    let factory = DefaultMessageFactory::new();

    c.bench_function("sequential_chain_10_services", |b| {
        b.iter_batched(
            || factory.new_string_message("benchmark payload").expect("message"),
            |mut msg| {
                runtime.block_on(services.do_service(&mut msg)).expect("chain");
                black_box(msg)
            },
            BatchSize::SmallInput,
        )
    });
}

fn benchmark_workflow_on_message(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let workflow = StandardWorkflow::builder("bench-workflow")
        .services(Arc::new(chain(10)))
        .producer(Arc::new(NullProducer::default()))
        .build()
        .expect("workflow");
    runtime.block_on(async {
        workflow.request_init().await.expect("init");
        workflow.request_start().await.expect("start");
    });
    let factory = DefaultMessageFactory::new();

    c.bench_function("workflow_on_message", |b| {
        b.iter_batched(
            || factory.new_string_message("benchmark payload").expect("message"),
            |msg| black_box(runtime.block_on(workflow.on_message(msg)).expect("outcome")),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, benchmark_sequential_chain, benchmark_workflow_on_message);
criterion_main!(benches);
