// SPDX-License-Identifier: CEPL-1.0
//! With `embed-shaders`, compiles `shaders/scene.{vert,frag}` to SPIR-V in OUT_DIR.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    #[cfg(feature = "embed-shaders")]
    embed::compile_all();
}

#[cfg(feature = "embed-shaders")]
mod embed {
    use std::{env, fs, path::PathBuf};

    const SOURCES: [(&str, shaderc::ShaderKind); 2] = [
        ("scene.vert", shaderc::ShaderKind::Vertex),
        ("scene.frag", shaderc::ShaderKind::Fragment),
    ];

    pub fn compile_all() {
        let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
        let dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"))
            .join("shaders");

        let comp = shaderc::Compiler::new().expect("shaderc compiler");
        let mut opts = shaderc::CompileOptions::new().expect("shaderc options");
        opts.set_target_env(
            shaderc::TargetEnv::Vulkan,
            shaderc::EnvVersion::Vulkan1_0 as u32,
        );
        opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

        for (name, kind) in SOURCES {
            let path = dir.join(name);
            println!("cargo:rerun-if-changed={}", path.display());
            let src = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
            let spv = comp
                .compile_into_spirv(&src, kind, name, "main", Some(&opts))
                .unwrap_or_else(|e| panic!("compiling {name}: {e}"));
            fs::write(out.join(format!("{name}.spv")), spv.as_binary_u8())
                .unwrap_or_else(|e| panic!("writing {name}.spv: {e}"));
        }
    }
}
