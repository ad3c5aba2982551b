//! Redactable set signature CLI
//!
//! ```text
//! redactset keygen {small <universe_file> | large | derler}
//! redactset sign   {small|large} <sign_key_file> <set_file> <policy>
//! redactset sign   derler <sign_key_file> <set_file>
//! redactset redact {small|large} <ver_key_file> <set_file> <subset_file> <policy> <sig_file>
//! redactset redact derler <ver_key_file> <set_file> <subset_file> <sig_file>
//! redactset verify {small|large|derler} <ver_key_file> <set_file> <sig_file>
//! redactset help | test | perf
//! ```
//!
//! File formats:
//! - set / universe files: UTF-8, one member per line (universe line `i`
//!   has index `i`); blank lines are ignored.
//! - key files: line 1 is the base64 DER key body; small-universe key
//!   files carry the universe file path on line 2. `keygen` prints the
//!   verification key block, a `-----` separator line, then the signing
//!   key block, ready to be split into two files.
//! - signature files: base64 of the signature DER.
//!
//! `redact` prints `Redacted set is not valid.` when the subset is
//! inadmissible; `verify` prints `Accept.` or `Reject.`. Both are
//! informational outcomes and exit 0; exit code 1 is reserved for
//! user-facing errors (bad arguments, unreadable or malformed files).

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::time::Instant;
use std::{env, fs, process};

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::OsRng;

use redactset::keys::{self, PairingSigningKey, PairingVerificationKey, RsaSigningKey, RsaVerificationKey};
use redactset::schemes::{derler, large, small};

const KEY_SEPARATOR: &str = "-----";
const NOT_VALID: &str = "Redacted set is not valid.";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(cmd) = args.get(1) else {
        print_help();
        process::exit(1);
    };
    match cmd.as_str() {
        "keygen" => cmd_keygen(&args[2..]),
        "sign" => cmd_sign(&args[2..]),
        "redact" => cmd_redact(&args[2..]),
        "verify" => cmd_verify(&args[2..]),
        "help" => {
            print_help();
            Ok(())
        }
        "test" => cmd_test(),
        "perf" => cmd_perf(),
        other => {
            eprintln!("unknown subcommand `{other}`");
            print_help();
            process::exit(1);
        }
    }
}

fn print_help() {
    eprintln!("redactable set signatures");
    eprintln!();
    eprintln!("usage:");
    eprintln!("  redactset keygen {{small <universe_file> | large | derler}}");
    eprintln!("  redactset sign   {{small|large}} <sign_key_file> <set_file> <policy>");
    eprintln!("  redactset sign   derler <sign_key_file> <set_file>");
    eprintln!("  redactset redact {{small|large}} <ver_key_file> <set_file> <subset_file> <policy> <sig_file>");
    eprintln!("  redactset redact derler <ver_key_file> <set_file> <subset_file> <sig_file>");
    eprintln!("  redactset verify {{small|large|derler}} <ver_key_file> <set_file> <sig_file>");
    eprintln!("  redactset help | test | perf");
    eprintln!();
    eprintln!("keygen prints the verification key block, a `{KEY_SEPARATOR}` line, then the");
    eprintln!("signing key block; small-universe key blocks include the universe path line.");
}

// ----------------------------------------------------------------------------
// File plumbing
// ----------------------------------------------------------------------------

fn read_members(path: &str) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect())
}

fn read_set(path: &str) -> Result<BTreeSet<String>> {
    Ok(read_members(path)?.into_iter().collect())
}

fn load_universe(path: &str) -> Result<small::Universe> {
    let universe = small::Universe::from_members(read_members(path)?)
        .with_context(|| format!("universe file {path}"))?;
    Ok(universe)
}

/// Key files: line 1 base64 DER, line 2 (optional) universe file path.
fn read_key_file(path: &str) -> Result<(Vec<u8>, Option<String>)> {
    let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let mut lines = text.lines();
    let first = lines
        .next()
        .ok_or_else(|| anyhow!("key file {path} is empty"))?;
    let der = keys::decode_key_line(first).with_context(|| format!("key file {path}"))?;
    let universe = lines
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    Ok((der, universe))
}

fn read_signature_file(path: &str) -> Result<Vec<u8>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let compact: String = text.split_whitespace().collect();
    keys::decode_key_line(&compact).with_context(|| format!("signature file {path}"))
}

fn universe_for(path: &str, universe_line: Option<String>) -> Result<small::Universe> {
    let upath = universe_line
        .ok_or_else(|| anyhow!("key file {path} is missing its universe path line"))?;
    load_universe(&upath)
}

/// Short SHA-256 fingerprint of a DER body, for the audit trail printed
/// alongside freshly generated keys.
fn fingerprint(der: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(der);
    hex::encode(&digest[..8])
}

// ----------------------------------------------------------------------------
// Subcommands
// ----------------------------------------------------------------------------

fn cmd_keygen(rest: &[String]) -> Result<()> {
    let mut rng = OsRng;
    match rest.first().map(String::as_str) {
        Some("small") => {
            let upath = rest
                .get(1)
                .context("usage: keygen small <universe_file>")?;
            let universe = load_universe(upath)?;
            eprintln!("universe: {} members", universe.len());
            eprintln!("generating RSA accumulator key material (this can take a while)...");
            let sk = RsaSigningKey::generate(&mut rng);
            let vk = sk.verification_key();
            let vk_der = vk.to_der()?;
            eprintln!("verification key fingerprint: {}", fingerprint(&vk_der));
            println!("{}", keys::encode_key_line(&vk_der));
            println!("{upath}");
            println!("{KEY_SEPARATOR}");
            println!("{}", keys::encode_key_line(&sk.to_der()?));
            println!("{upath}");
        }
        Some("large") => {
            eprintln!("generating RSA accumulator key material (this can take a while)...");
            let sk = RsaSigningKey::generate(&mut rng);
            let vk = sk.verification_key();
            let vk_der = vk.to_der()?;
            eprintln!("verification key fingerprint: {}", fingerprint(&vk_der));
            println!("{}", keys::encode_key_line(&vk_der));
            println!("{KEY_SEPARATOR}");
            println!("{}", keys::encode_key_line(&sk.to_der()?));
        }
        Some("derler") => {
            let sk = PairingSigningKey::generate(&mut rng);
            let vk = sk.verification_key();
            let vk_der = vk.to_der()?;
            eprintln!("verification key fingerprint: {}", fingerprint(&vk_der));
            println!("{}", keys::encode_key_line(&vk_der));
            println!("{KEY_SEPARATOR}");
            println!("{}", keys::encode_key_line(&sk.to_der()?));
        }
        _ => bail!("usage: keygen {{small <universe_file> | large | derler}}"),
    }
    Ok(())
}

fn cmd_sign(rest: &[String]) -> Result<()> {
    match rest.first().map(String::as_str) {
        Some("small") => {
            let [key_file, set_file, policy] = expect_args(&rest[1..], "sign small <sign_key_file> <set_file> <policy>")?;
            let (der, universe_line) = read_key_file(key_file)?;
            let universe = universe_for(key_file, universe_line)?;
            let sk = RsaSigningKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let sig = small::sign(&sk, &universe, &set, policy)?;
            println!("{}", keys::encode_key_line(&sig.to_der()));
        }
        Some("large") => {
            let [key_file, set_file, policy] = expect_args(&rest[1..], "sign large <sign_key_file> <set_file> <policy>")?;
            let (der, _) = read_key_file(key_file)?;
            let sk = RsaSigningKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let sig = large::sign(&sk, &set, policy, &mut OsRng)?;
            println!("{}", keys::encode_key_line(&sig.to_der()));
        }
        Some("derler") => {
            let [key_file, set_file] = expect_args(&rest[1..], "sign derler <sign_key_file> <set_file>")?;
            let (der, _) = read_key_file(key_file)?;
            let sk = PairingSigningKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let sig = derler::sign(&sk, &set)?;
            println!("{}", keys::encode_key_line(&sig.to_der()));
        }
        _ => bail!("usage: sign {{small|large|derler}} ..."),
    }
    Ok(())
}

fn cmd_redact(rest: &[String]) -> Result<()> {
    let redacted: Option<Vec<u8>> = match rest.first().map(String::as_str) {
        Some("small") => {
            let [key_file, set_file, subset_file, policy, sig_file] = expect_args(
                &rest[1..],
                "redact small <ver_key_file> <set_file> <subset_file> <policy> <sig_file>",
            )?;
            let (der, universe_line) = read_key_file(key_file)?;
            let universe = universe_for(key_file, universe_line)?;
            let _vk = RsaVerificationKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let subset = read_set(subset_file)?;
            let sig = small::Signature::from_der(&read_signature_file(sig_file)?)?;
            small::redact(&universe, &set, &subset, &sig, policy)?.map(|s| s.to_der())
        }
        Some("large") => {
            let [key_file, set_file, subset_file, policy, sig_file] = expect_args(
                &rest[1..],
                "redact large <ver_key_file> <set_file> <subset_file> <policy> <sig_file>",
            )?;
            let (der, _) = read_key_file(key_file)?;
            let _vk = RsaVerificationKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let subset = read_set(subset_file)?;
            let sig = large::Signature::from_der(&read_signature_file(sig_file)?)?;
            large::redact(&set, &subset, &sig, Some(policy))?.map(|s| s.to_der())
        }
        Some("derler") => {
            let [key_file, set_file, subset_file, sig_file] = expect_args(
                &rest[1..],
                "redact derler <ver_key_file> <set_file> <subset_file> <sig_file>",
            )?;
            let (der, _) = read_key_file(key_file)?;
            let _vk = PairingVerificationKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let subset = read_set(subset_file)?;
            let sig = derler::Signature::from_der(&read_signature_file(sig_file)?)?;
            derler::redact(&set, &subset, &sig).map(|s| s.to_der())
        }
        _ => bail!("usage: redact {{small|large|derler}} ..."),
    };

    // An inadmissible subset is an answer, not an error: print the
    // marker and exit 0, the same way `verify` reports `Reject.`.
    match redacted {
        Some(der) => println!("{}", keys::encode_key_line(&der)),
        None => println!("{NOT_VALID}"),
    }
    Ok(())
}

fn cmd_verify(rest: &[String]) -> Result<()> {
    let accepted = match rest.first().map(String::as_str) {
        Some("small") => {
            let [key_file, set_file, sig_file] =
                expect_args(&rest[1..], "verify small <ver_key_file> <set_file> <sig_file>")?;
            let (der, universe_line) = read_key_file(key_file)?;
            let universe = universe_for(key_file, universe_line)?;
            let vk = RsaVerificationKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let sig = small::Signature::from_der(&read_signature_file(sig_file)?)?;
            small::verify(&vk, &universe, &sig, &set)
        }
        Some("large") => {
            let [key_file, set_file, sig_file] =
                expect_args(&rest[1..], "verify large <ver_key_file> <set_file> <sig_file>")?;
            let (der, _) = read_key_file(key_file)?;
            let vk = RsaVerificationKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let sig = large::Signature::from_der(&read_signature_file(sig_file)?)?;
            large::verify(&vk, &sig, &set)
        }
        Some("derler") => {
            let [key_file, set_file, sig_file] =
                expect_args(&rest[1..], "verify derler <ver_key_file> <set_file> <sig_file>")?;
            let (der, _) = read_key_file(key_file)?;
            let vk = PairingVerificationKey::from_der(&der)?;
            let set = read_set(set_file)?;
            let sig = derler::Signature::from_der(&read_signature_file(sig_file)?)?;
            derler::verify(&vk, &sig, &set)
        }
        _ => bail!("usage: verify {{small|large|derler}} <ver_key_file> <set_file> <sig_file>"),
    };

    if accepted {
        println!("Accept.");
    } else {
        println!("Reject.");
    }
    Ok(())
}

/// In-process smoke test over all three schemes (reduced RSA factor
/// widths so it finishes quickly).
fn cmd_test() -> Result<()> {
    let mut rng = OsRng;

    // Large universe, deep policy.
    {
        let sk = RsaSigningKey::generate_with_bits(512, &mut rng);
        let vk = sk.verification_key();
        let set: BTreeSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let sig = large::sign(&sk, &set, "(a and b) or (c and d)", &mut rng)?;
        if !large::verify(&vk, &sig, &set) {
            bail!("large-universe: fresh signature did not verify");
        }
        let sub: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let redacted = large::redact(&set, &sub, &sig, Some("a and b"))?
            .ok_or_else(|| anyhow!("large-universe: admissible redaction was refused"))?;
        if !large::verify(&vk, &redacted, &sub) {
            bail!("large-universe: redacted signature did not verify");
        }
        let bad: BTreeSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        if large::redact(&set, &bad, &sig, Some("a or c"))?.is_some() {
            bail!("large-universe: inadmissible redaction was allowed");
        }
        println!("large-universe: ok");
    }

    // Small universe, bit-string policy.
    {
        let sk = RsaSigningKey::generate_with_bits(512, &mut rng);
        let vk = sk.verification_key();
        let universe = small::Universe::from_members(
            ["hello", "good", "fun", "dog", "cat"].iter().map(|s| s.to_string()),
        )?;
        let set: BTreeSet<String> = ["hello", "good", "fun", "dog", "cat"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let sig = small::sign(&sk, &universe, &set, "11111, 11000, 00111")?;
        if !small::verify(&vk, &universe, &sig, &set) {
            bail!("small-universe: fresh signature did not verify");
        }
        let sub: BTreeSet<String> = ["hello", "good"].iter().map(|s| s.to_string()).collect();
        let redacted = small::redact(&universe, &set, &sub, &sig, "11000")?
            .ok_or_else(|| anyhow!("small-universe: admissible redaction was refused"))?;
        if !small::verify(&vk, &universe, &redacted, &sub) {
            bail!("small-universe: redacted signature did not verify");
        }
        let bad: BTreeSet<String> = ["hello", "cat"].iter().map(|s| s.to_string()).collect();
        if small::redact(&universe, &set, &bad, &sig, "10001")?.is_some() {
            bail!("small-universe: inadmissible redaction was allowed");
        }
        println!("small-universe: ok");
    }

    // Accumulator only.
    {
        let sk = PairingSigningKey::generate(&mut rng);
        let vk = sk.verification_key();
        let set: BTreeSet<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();
        let sig = derler::sign(&sk, &set)?;
        if !derler::verify(&vk, &sig, &set) {
            bail!("accumulator-only: fresh signature did not verify");
        }
        let sub: BTreeSet<String> = ["alpha"].iter().map(|s| s.to_string()).collect();
        let redacted = derler::redact(&set, &sub, &sig)
            .ok_or_else(|| anyhow!("accumulator-only: admissible redaction was refused"))?;
        if !derler::verify(&vk, &redacted, &sub) {
            bail!("accumulator-only: redacted signature did not verify");
        }
        let larger: BTreeSet<String> = ["alpha", "beta"].iter().map(|s| s.to_string()).collect();
        if derler::verify(&vk, &redacted, &larger) {
            bail!("accumulator-only: redacted signature verified a removed member");
        }
        println!("accumulator-only: ok");
    }

    println!("All scheme self-tests passed.");
    Ok(())
}

/// Rough timing loop; reduced RSA widths, 16-member sets.
fn cmd_perf() -> Result<()> {
    let mut rng = OsRng;
    let members: Vec<String> = (0..16).map(|i| format!("member{i:02}")).collect();
    let set: BTreeSet<String> = members.iter().cloned().collect();

    {
        let t = Instant::now();
        let sk = RsaSigningKey::generate_with_bits(512, &mut rng);
        let vk = sk.verification_key();
        eprintln!("large keygen (512-bit factors): {:?}", t.elapsed());

        let policy = members.join(" and ");
        let t = Instant::now();
        let sig = large::sign(&sk, &set, &policy, &mut rng)?;
        eprintln!("large sign, 16 members:          {:?}", t.elapsed());

        let t = Instant::now();
        let ok = large::verify(&vk, &sig, &set);
        eprintln!("large verify ({ok}):             {:?}", t.elapsed());
    }

    {
        let t = Instant::now();
        let sk = PairingSigningKey::generate(&mut rng);
        let vk = sk.verification_key();
        eprintln!("derler keygen:                   {:?}", t.elapsed());

        let t = Instant::now();
        let sig = derler::sign(&sk, &set)?;
        eprintln!("derler sign, 16 members:         {:?}", t.elapsed());

        let t = Instant::now();
        let ok = derler::verify(&vk, &sig, &set);
        eprintln!("derler verify ({ok}):            {:?}", t.elapsed());
    }

    Ok(())
}

// ----------------------------------------------------------------------------
// Argument plumbing
// ----------------------------------------------------------------------------

fn expect_args<'a, const N: usize>(rest: &'a [String], usage: &str) -> Result<[&'a str; N]> {
    if rest.len() != N {
        bail!("usage: {usage}");
    }
    let mut out = [""; N];
    for (slot, arg) in out.iter_mut().zip(rest) {
        *slot = arg.as_str();
    }
    Ok(out)
}
