use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use wishwall::{
    derive_wish_address, Ledger, MemoryLedger, SignedInstruction, WishError, WishInstruction,
    WishProgram, WishRecord, MAX_TITLE_LEN,
};

const SOL: u64 = 1_000_000_000;

struct Wall {
    program: WishProgram,
    ledger: MemoryLedger,
}

impl Wall {
    fn new() -> Self {
        Self {
            program: WishProgram::new(Pubkey::new_unique()),
            ledger: MemoryLedger::new(),
        }
    }

    fn funded(&mut self) -> Keypair {
        let key = Keypair::new();
        self.ledger.airdrop(&key.pubkey(), SOL);
        key
    }

    fn address(&self, owner: &Pubkey, title: &str) -> Pubkey {
        derive_wish_address(self.program.program_id(), owner, title).unwrap().0
    }

    fn submit(&mut self, signer: &Keypair, wish: Pubkey, instruction: WishInstruction) -> Result<(), WishError> {
        let signed = SignedInstruction::sign(self.program.program_id(), signer, wish, instruction);
        self.program.process(&mut self.ledger, &signed)
    }

    fn create(&mut self, signer: &Keypair, title: &str) -> Result<(), WishError> {
        let wish = self.address(&signer.pubkey(), title);
        self.submit(signer, wish, WishInstruction::Create { title: title.into() })
    }

    fn delete_at(&mut self, signer: &Keypair, wish: Pubkey, title: &str) -> Result<(), WishError> {
        self.submit(signer, wish, WishInstruction::Delete { title: title.into() })
    }

    fn delete(&mut self, signer: &Keypair, title: &str) -> Result<(), WishError> {
        let wish = self.address(&signer.pubkey(), title);
        self.delete_at(signer, wish, title)
    }
}

#[test]
fn derivation_is_deterministic() {
    let program_id = Pubkey::new_unique();
    for title in ["", "a", "I wish to learn Solana", &"z".repeat(MAX_TITLE_LEN)] {
        let owner = Pubkey::new_unique();
        assert_eq!(
            derive_wish_address(&program_id, &owner, title),
            derive_wish_address(&program_id, &owner, title)
        );
    }
}

#[test]
fn create_delete_create_reuses_address() {
    let mut wall = Wall::new();
    let owner = wall.funded();
    let wish = wall.address(&owner.pubkey(), "rain");

    wall.create(&owner, "rain").unwrap();
    wall.delete(&owner, "rain").unwrap();
    assert!(wall.ledger.account(&wish).is_none());
    wall.create(&owner, "rain").unwrap();
    assert_eq!(wall.address(&owner.pubkey(), "rain"), wish);
    assert_eq!(
        wall.program.fetch(&wall.ledger, &wish),
        Ok(Some(WishRecord::new(owner.pubkey(), "rain")))
    );
}

#[test]
fn second_create_conflicts() {
    let mut wall = Wall::new();
    let owner = wall.funded();
    wall.create(&owner, "rain").unwrap();
    let before = wall.ledger.lamports(&owner.pubkey());
    assert_eq!(wall.create(&owner, "rain"), Err(WishError::AlreadyExists));
    assert_eq!(wall.ledger.lamports(&owner.pubkey()), before);
}

#[test]
fn delete_without_create_is_not_found() {
    let mut wall = Wall::new();
    let owner = wall.funded();
    assert_eq!(wall.delete(&owner, "rain"), Err(WishError::NotFound));
}

#[test]
fn delete_of_empty_foreign_address_is_mismatch() {
    let mut wall = Wall::new();
    let owner = wall.funded();
    let other = Pubkey::new_unique();
    let wish = wall.address(&other, "rain");
    assert_eq!(wall.delete_at(&owner, wish, "rain"), Err(WishError::AddressMismatch));
}

#[test]
fn non_owner_cannot_delete() {
    let mut wall = Wall::new();
    let owner = wall.funded();
    let intruder = wall.funded();
    wall.create(&owner, "rain").unwrap();
    let wish = wall.address(&owner.pubkey(), "rain");
    let before = wall.ledger.account(&wish).unwrap();

    assert_eq!(wall.delete_at(&intruder, wish, "rain"), Err(WishError::Unauthorized));
    assert_eq!(wall.ledger.account(&wish), Some(before));
    assert_eq!(wall.ledger.lamports(&intruder.pubkey()), SOL);
}

#[test]
fn title_capacity_boundary() {
    let mut wall = Wall::new();
    let owner = wall.funded();
    let longest = "w".repeat(MAX_TITLE_LEN);
    wall.create(&owner, &longest).unwrap();
    let account = wall.ledger.account(&wall.address(&owner.pubkey(), &longest)).unwrap();
    assert_eq!(account.data.len(), 8 + 32 + 4 + MAX_TITLE_LEN);

    let too_long = "w".repeat(MAX_TITLE_LEN + 1);
    let wish = Pubkey::new_unique();
    assert_eq!(
        wall.submit(&owner, wish, WishInstruction::Create { title: too_long }),
        Err(WishError::TitleTooLong)
    );
}

#[test]
fn two_owners_same_title() {
    let mut wall = Wall::new();
    let a = wall.funded();
    let b = wall.funded();
    let title = "I wish to learn Solana";
    let p1 = wall.address(&a.pubkey(), title);
    let p2 = wall.address(&b.pubkey(), title);
    assert_ne!(p1, p2);

    wall.create(&a, title).unwrap();
    assert_eq!(
        wall.program.fetch(&wall.ledger, &p1),
        Ok(Some(WishRecord::new(a.pubkey(), title)))
    );
    wall.create(&b, title).unwrap();

    assert_eq!(wall.delete_at(&b, p1, title), Err(WishError::Unauthorized));
    wall.delete_at(&a, p1, title).unwrap();
    assert_eq!(wall.program.fetch(&wall.ledger, &p1), Ok(None));
    assert!(wall.program.fetch(&wall.ledger, &p2).unwrap().is_some());
    assert_eq!(wall.ledger.lamports(&a.pubkey()), SOL);
}

#[test]
fn scan_lists_only_requested_owner() {
    let mut wall = Wall::new();
    let a = wall.funded();
    let b = wall.funded();
    wall.create(&a, "one").unwrap();
    wall.create(&a, "two").unwrap();
    wall.create(&b, "one").unwrap();
    wall.delete(&a, "two").unwrap();

    let listed = wall.program.wishes_of(&wall.ledger, &a.pubkey());
    assert_eq!(listed, vec![(wall.address(&a.pubkey(), "one"), WishRecord::new(a.pubkey(), "one"))]);
}
