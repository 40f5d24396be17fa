use anyhow::Result;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use wishwall::{
    derive_wish_address, Ledger, MemoryLedger, SignedInstruction, WishInstruction, WishProgram,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let program = WishProgram::new(Pubkey::new_unique());
    let mut ledger = MemoryLedger::new();
    let alice = Keypair::new();
    let bob = Keypair::new();
    ledger.airdrop(&alice.pubkey(), 1_000_000_000);
    ledger.airdrop(&bob.pubkey(), 1_000_000_000);

    let title = "I wish to learn Solana";
    let (wish, bump) = derive_wish_address(program.program_id(), &alice.pubkey(), title)?;
    println!("wish address {wish} (bump {bump})");

    let create = SignedInstruction::sign(
        program.program_id(),
        &alice,
        wish,
        WishInstruction::Create { title: title.into() },
    );
    program.process(&mut ledger, &create)?;
    println!("stored: {:?}", program.fetch(&ledger, &wish)?);
    println!("deposit held: {} lamports", ledger.lamports(&wish));

    let delete = WishInstruction::Delete { title: title.into() };
    let by_bob = SignedInstruction::sign(program.program_id(), &bob, wish, delete.clone());
    match program.process(&mut ledger, &by_bob) {
        Ok(()) => println!("bob deleted alice's wish?!"),
        Err(err) => println!("bob's delete rejected: {err}"),
    }

    let by_alice = SignedInstruction::sign(program.program_id(), &alice, wish, delete);
    program.process(&mut ledger, &by_alice)?;
    println!("after delete: {:?}", program.fetch(&ledger, &wish)?);
    Ok(())
}
