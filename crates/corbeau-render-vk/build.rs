// SPDX-License-Identifier: CEPL-1.0
use std::{env, fs, path::PathBuf};

const SHADERS: [(&str, shaderc::ShaderKind); 2] = [
  ("basic.vert", shaderc::ShaderKind::Vertex),
  ("basic.frag", shaderc::ShaderKind::Fragment),
];

fn main() {
  let out = PathBuf::from(env::var("OUT_DIR").unwrap());
  let dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("shaders");

  let comp = shaderc::Compiler::new().unwrap();
  let mut opts = shaderc::CompileOptions::new().unwrap();
  opts.set_target_env(
    shaderc::TargetEnv::Vulkan,
    shaderc::EnvVersion::Vulkan1_0 as u32,
  );
  opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

  for (name, kind) in SHADERS {
    let path = dir.join(name);
    println!("cargo:rerun-if-changed={}", path.display());

    let src = fs::read_to_string(&path)
      .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
    let spv = comp
      .compile_into_spirv(&src, kind, name, "main", Some(&opts))
      .unwrap_or_else(|e| panic!("compiling {name}: {e}"));
    if spv.get_num_warnings() > 0 {
      println!("cargo:warning={name}: {}", spv.get_warning_messages());
    }

    // same names the runtime loader looks for in the shader directory
    fs::write(out.join(format!("{name}.spirv")), spv.as_binary_u8()).unwrap();
  }

  println!("cargo:rerun-if-changed=build.rs");
}
