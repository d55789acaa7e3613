//! Solidity bindings for the subset of the ERC-20 interface the snapshot
//! pipeline reads.

#![allow(missing_docs)]

alloy::sol! {
    /// Minimal ERC-20 interface: metadata getters and the `Transfer` event.
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}
