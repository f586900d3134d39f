use clap::{Parser, Subcommand};
use merkledrop_hash::{Address, Digest, DIGEST_LEN};
use merkledrop_proof::{combine_proofs, merklize, verify_award, Distribution, Record};
use std::{fs, path::PathBuf};

#[derive(Parser)]
#[command(name = "merkledrop", version, about = "Merkle airdrop commitment tool")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build a commitment from a record file (one `address,amount` per line)
    Build {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "distribution.bin")]
        out: PathBuf,
    },
    /// Print the root of a saved distribution
    Root {
        #[arg(long, default_value = "distribution.bin")]
        dist: PathBuf,
    },
    /// Print one recipient's award (amount, index, proof)
    ShowAward {
        #[arg(long, default_value = "distribution.bin")]
        dist: PathBuf,
        #[arg(long)]
        address: String,
    },
    /// Re-verify one recipient's award against the stored root
    Verify {
        #[arg(long, default_value = "distribution.bin")]
        dist: PathBuf,
        #[arg(long)]
        address: String,
        /// Root to check against, hex; defaults to the distribution's own
        #[arg(long)]
        root: Option<String>,
    },
    /// Pack one claimant's proofs from several distributions into a combined proof
    Combine {
        /// Distribution files, in the order the claim will list airdrop ids
        #[arg(long, required = true, num_args = 1..)]
        dist: Vec<PathBuf>,
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "combined.bin")]
        out: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Build { input, out } => {
            let records = read_records(&input);
            let setup = merklize(&records).expect("merklize");
            let mut f = fs::File::create(&out).expect("create");
            bincode::serialize_into(&mut f, &setup).expect("encode");
            println!("root=0x{}", hex::encode(setup.root));
            println!("awards={} wrote {}", setup.awards.len(), out.display());
        }
        Cmd::Root { dist } => {
            let setup = read_distribution(&dist);
            println!("0x{}", hex::encode(setup.root));
        }
        Cmd::ShowAward { dist, address } => {
            let setup = read_distribution(&dist);
            let address: Address = address.parse().expect("address hex");
            let award = setup.award_for(&address).expect("no award for address");
            println!("address={}", award.address);
            println!("amount={}", award.amount);
            println!("index={}", award.index);
            for (i, h) in award.proof.iter().enumerate() {
                println!("proof[{}]=0x{}", i, hex::encode(h));
            }
        }
        Cmd::Verify { dist, address, root } => {
            let setup = read_distribution(&dist);
            let address: Address = address.parse().expect("address hex");
            let award = setup.award_for(&address).expect("no award for address");
            let root = match root {
                Some(h) => parse_root(&h),
                None => setup.root,
            };
            let ok = verify_award(&root, &award.address, award.amount, award.index, &award.proof);
            println!("{}", if ok { "valid" } else { "invalid" });
        }
        Cmd::Combine { dist, address, out } => {
            let address: Address = address.parse().expect("address hex");
            let mut proofs = Vec::with_capacity(dist.len());
            for path in &dist {
                let setup = read_distribution(path);
                let award = setup.award_for(&address).expect("no award for address");
                proofs.push(award.proof.clone());
            }
            let combined = combine_proofs(&proofs).expect("combine");
            let mut f = fs::File::create(&out).expect("create");
            bincode::serialize_into(&mut f, &combined).expect("encode");
            println!(
                "proofs={} hashes={} wrote {}",
                combined.proof_count(),
                combined.hashes.len(),
                out.display()
            );
        }
    }
}

fn read_records(path: &PathBuf) -> Vec<Record> {
    let text = fs::read_to_string(path).expect("read input");
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (addr, amount) = line
            .split_once(',')
            .unwrap_or_else(|| panic!("line {}: expected `address,amount`", n + 1));
        let address: Address = addr
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("line {}: {}", n + 1, e));
        records.push(Record::new(address, amount.trim()));
    }
    records
}

fn read_distribution(path: &PathBuf) -> Distribution {
    let f = fs::File::open(path).expect("open distribution");
    bincode::deserialize_from(f).expect("decode distribution")
}

fn parse_root(text: &str) -> Digest {
    let text = text.strip_prefix("0x").unwrap_or(text);
    let mut root = [0u8; DIGEST_LEN];
    hex::decode_to_slice(text, &mut root).expect("root hex");
    root
}
