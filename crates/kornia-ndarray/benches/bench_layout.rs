use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use kornia_ndarray::{DType, Descriptor, NdArray, Order};

fn sample_array() -> NdArray {
    NdArray::zeros(
        Descriptor::from_type(DType::Float32),
        &[1080, 1080, 3],
        Order::C,
    )
    .unwrap()
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("Layout");

    group.bench_function("set_shape_contiguous", |b| {
        let a = sample_array();
        b.iter(|| {
            a.set_shape(black_box(&[1080 * 1080, 3]), Order::C).unwrap();
            a.set_shape(black_box(&[1080, 1080, 3]), Order::C).unwrap();
        })
    });

    group.bench_function("set_strides_transpose", |b| {
        let a = sample_array();
        b.iter(|| {
            a.set_strides(black_box(&[4, 4320, 1080 * 4320])).unwrap();
            a.set_strides(black_box(&[12960, 12, 4])).unwrap();
        })
    });

    group.bench_function("get_real_complex", |b| {
        let z = NdArray::zeros(
            Descriptor::from_type(DType::Complex128),
            &[512, 512],
            Order::C,
        )
        .unwrap();
        b.iter(|| black_box(&z).get_real().unwrap())
    });

    group.bench_function("new_copy_transposed", |b| {
        let a = NdArray::zeros(Descriptor::from_type(DType::UInt8), &[512, 512], Order::C).unwrap();
        let t = NdArray::new_view(a.descriptor(), &[512, 512], &[1, 512], &a, 0).unwrap();
        b.iter(|| black_box(&t).new_copy(Order::C).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
