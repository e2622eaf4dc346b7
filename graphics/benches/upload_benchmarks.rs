use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tessera_core::math::Size2;
use tessera_core::texture::PixelFormat;
use tessera_graphics::{
    BackendType, BufferDescriptor, DeviceConfig, HeadlessHost, RenderDevice, TextureDescriptor,
    TextureFlags,
};

fn create_device(backend: BackendType) -> Arc<RenderDevice> {
    let host = Arc::new(HeadlessHost::new(Size2::new(256.0, 256.0)));
    RenderDevice::new(DeviceConfig::new().with_backend(backend).with_vsync(false), host).unwrap()
}

// ---------------------------------------------------------------------------
// Buffer uploads
// ---------------------------------------------------------------------------

fn bench_dynamic_buffer_update(c: &mut Criterion) {
    for (name, backend) in [("d3d11", BackendType::Direct3D11), ("opengl", BackendType::OpenGl)] {
        if !backend.is_available() {
            continue;
        }
        let device = create_device(backend);
        let data = vec![0x5Au8; 64 * 1024];
        let buffer = device
            .create_buffer(&BufferDescriptor::vertex().with_dynamic(true).with_data(data.clone()))
            .unwrap();
        device.render_frame().unwrap();

        c.bench_function(&format!("{name}_dynamic_buffer_update_64k"), |b| {
            b.iter(|| {
                buffer.set_data(black_box(&data)).unwrap();
                black_box(device.render_frame().unwrap());
            });
        });
    }
}

fn bench_static_buffer_recreate(c: &mut Criterion) {
    for (name, backend) in [("d3d11", BackendType::Direct3D11), ("opengl", BackendType::OpenGl)] {
        if !backend.is_available() {
            continue;
        }
        let device = create_device(backend);
        let data = vec![0xA5u8; 64 * 1024];
        let buffer = device
            .create_buffer(&BufferDescriptor::index().with_data(data.clone()))
            .unwrap();
        device.render_frame().unwrap();

        c.bench_function(&format!("{name}_static_buffer_update_64k"), |b| {
            b.iter(|| {
                buffer.set_data(black_box(&data)).unwrap();
                black_box(device.render_frame().unwrap());
            });
        });
    }
}

// ---------------------------------------------------------------------------
// Texture uploads
// ---------------------------------------------------------------------------

fn bench_dynamic_texture_update(c: &mut Criterion) {
    for (name, backend) in [("d3d11", BackendType::Direct3D11), ("opengl", BackendType::OpenGl)] {
        if !backend.is_available() {
            continue;
        }
        let device = create_device(backend);
        let size = Size2::new(256.0, 256.0);
        let pixels = vec![0x7Fu8; 256 * 256 * 4];
        let texture = device
            .create_texture(
                &TextureDescriptor::new(size, PixelFormat::Rgba8Unorm)
                    .with_flags(TextureFlags::DYNAMIC)
                    .with_data(pixels.clone()),
            )
            .unwrap();
        device.render_frame().unwrap();

        c.bench_function(&format!("{name}_dynamic_texture_update_256x256"), |b| {
            b.iter(|| {
                texture.set_data(black_box(&pixels), size).unwrap();
                black_box(device.render_frame().unwrap());
            });
        });
    }
}

fn bench_mipmapped_texture_create(c: &mut Criterion) {
    let device = create_device(BackendType::Default);
    let size = Size2::new(256.0, 256.0);
    let pixels = vec![0x40u8; 256 * 256 * 4];

    c.bench_function("mipmapped_texture_create_256x256", |b| {
        b.iter(|| {
            let texture = device
                .create_texture(
                    &TextureDescriptor::new(size, PixelFormat::Rgba8Unorm)
                        .with_flags(TextureFlags::MIPMAPS)
                        .with_data(pixels.clone()),
                )
                .unwrap();
            device.render_frame().unwrap();
            black_box(texture);
        });
    });
}

criterion_group!(
    benches,
    bench_dynamic_buffer_update,
    bench_static_buffer_recreate,
    bench_dynamic_texture_update,
    bench_mipmapped_texture_create,
);
criterion_main!(benches);
