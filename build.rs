use anyhow::Result;

fn main() -> Result<()> {
  let commit = std::process::Command::new("git")
    .args(["rev-parse", "HEAD"])
    .output()
    .ok()
    .filter(|output| output.status.success())
    .map(|output| String::from_utf8(output.stdout))
    .transpose()?
    .unwrap_or_else(|| "unknown".to_string());
  println!("cargo:rustc-env=COMMIT_HASH={}", commit.trim());
  println!("cargo:rerun-if-changed=.git/HEAD");
  Ok(())
}
